//! Manual smoke run against a live server: two users, a tagged comment,
//! a reply, votes and the notification inbox.

use serde_json::{json, Value};

const DEFAULT_BASE_URL: &str = "http://127.0.0.1:3000";
const PASSWORD: &str = "ferris-says-hi";

struct Session {
    client: reqwest::Client,
    base: String,
    token: String,
}

impl Session {
    async fn open(client: &reqwest::Client, base: &str, username: &str) -> anyhow::Result<Self> {
        let creds = json!({ "username": username, "password": PASSWORD });

        let resp = client
            .post(format!("{}/register", base))
            .json(&creds)
            .send()
            .await?;
        println!("   -> register {}: {}", username, resp.status());

        let resp: Value = client
            .post(format!("{}/login", base))
            .json(&creds)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        let token = resp["token"]
            .as_str()
            .ok_or_else(|| anyhow::anyhow!("login response without token: {}", resp))?
            .to_string();

        Ok(Self {
            client: client.clone(),
            base: base.to_string(),
            token,
        })
    }

    async fn post(&self, path: &str, body: Value) -> anyhow::Result<Value> {
        let resp = self
            .client
            .post(format!("{}{}", self.base, path))
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await?;
        let status = resp.status();
        let body: Value = resp.json().await?;
        if !status.is_success() {
            anyhow::bail!("POST {} failed with {}: {}", path, status, body);
        }
        Ok(body)
    }

    async fn get(&self, path: &str) -> anyhow::Result<Value> {
        Ok(self
            .client
            .get(format!("{}{}", self.base, path))
            .bearer_auth(&self.token)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let base = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
    let client = reqwest::Client::new();
    println!("Starting Nestwall smoke client against {}", base);

    println!("\n[1/4] Registering and logging in...");
    let ferris = Session::open(&client, &base, "ferris").await?;
    let corro = Session::open(&client, &base, "corro").await?;

    println!("\n[2/4] Posting a comment that tags @corro...");
    let posted = ferris
        .post(
            "/comments",
            json!({
                "comment": "Hello from the smoke client, @corro!",
                "mediaUrl": "https://rustacean.net/assets/rustacean-flat-happy.png"
            }),
        )
        .await?;
    let comment_id = posted["comment"]["id"]
        .as_str()
        .ok_or_else(|| anyhow::anyhow!("no comment id in {}", posted))?
        .to_string();
    println!("   -> comment {}", comment_id);

    println!("\n[3/4] Replying, liking, then switching to dislike...");
    corro
        .post(
            "/comments",
            json!({ "comment": "Hi back!", "parentId": comment_id }),
        )
        .await?;
    let liked = corro.post("/like-comment", json!({ "commentId": comment_id })).await?;
    println!("   -> after like: {}", liked);
    let disliked = corro
        .post("/dislike-comment", json!({ "commentId": comment_id }))
        .await?;
    println!("   -> after dislike: {}", disliked);

    println!("\n[4/4] Checking inboxes...");
    for (name, session) in [("ferris", &ferris), ("corro", &corro)] {
        let inbox = session.get("/notifications").await?;
        println!("   -> {} has {} unread", name, inbox["unread"]);
    }

    println!("\nDone.");
    Ok(())
}
