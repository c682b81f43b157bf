use clap::Parser;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;

const COLORS: [&str; 12] = [
    "red", "blue", "green", "yellow", "purple", "orange", "pink", "cyan", "brown", "white",
    "black", "gray",
];

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    #[arg(long, default_value = "http://localhost:3005")]
    url: String,

    #[arg(long, default_value_t = 10)]
    users: u32,

    #[arg(long, default_value_t = 3)]
    requests: u32,

    #[arg(long, default_value_t = 50)]
    size: u32,
}

#[derive(Deserialize)]
struct CanvasResponse {
    canvas: Vec<serde_json::Value>,
}

#[derive(Default)]
struct Tally {
    admitted: usize,
    cooldown: usize,
    rejected: usize,
    failed: usize,
}

#[tokio::main]
async fn main() -> Result<(), reqwest::Error> {
    let args = Args::parse();
    let client = Client::new();

    let handles: Vec<_> = (0..args.users)
        .map(|user| {
            let client = client.clone();
            let url = format!("{}/place-pixel", args.url);
            let (requests, size) = (args.requests, args.size);

            tokio::spawn(async move {
                let mut tally = Tally::default();

                for n in 0..requests {
                    let cell = user * requests + n;
                    let body = json!({
                        "userId": format!("tester{user}"),
                        "x": cell % size,
                        "y": (cell / size) % size,
                        "color": COLORS[(cell as usize) % COLORS.len()],
                    });

                    match client.post(&url).json(&body).send().await {
                        Ok(res) if res.status() == StatusCode::OK => tally.admitted += 1,
                        Ok(res) if res.status() == StatusCode::TOO_MANY_REQUESTS => {
                            tally.cooldown += 1
                        }
                        Ok(res) => {
                            println!("Rejected: {} {}", res.status(), res.text().await.unwrap_or_default());
                            tally.rejected += 1;
                        }
                        Err(e) => {
                            println!("Request failed: {e}");
                            tally.failed += 1;
                        }
                    }
                }

                tally
            })
        })
        .collect();

    let mut total = Tally::default();
    for handle in handles {
        if let Ok(tally) = handle.await {
            total.admitted += tally.admitted;
            total.cooldown += tally.cooldown;
            total.rejected += tally.rejected;
            total.failed += tally.failed;
        }
    }

    println!("Admitted: {}", total.admitted);
    println!("Cooldown: {}", total.cooldown);
    println!("Rejected: {}", total.rejected);
    println!("Failed: {}\n", total.failed);

    let canvas: CanvasResponse = client
        .get(format!("{}/canvas", args.url))
        .send()
        .await?
        .json()
        .await?;
    println!("Canvas pixels: {}", canvas.canvas.len());

    Ok(())
}
