//! Basic example demonstrating simple GET and POST calls.
//!
//! This example shows how to:
//! - Create a client with the default per-verb policies
//! - Make GET requests to fetch data
//! - Make POST requests to create data
//! - Read values, status codes, and errors out of an outcome
//!
//! Run with: `cargo run --example basic_call`

use gantry::{Client, Error};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Default)]
#[allow(dead_code)]
struct Post {
    #[serde(rename = "userId")]
    user_id: u32,
    id: u32,
    title: String,
    body: String,
}

#[derive(Debug, Serialize)]
struct NewPost {
    title: String,
    body: String,
    #[serde(rename = "userId")]
    user_id: u32,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Initialize tracing for logging
    tracing_subscriber::fmt()
        .with_env_filter("gantry=debug,basic_call=info")
        .init();

    let client = Client::builder().build()?;

    println!("=== GET Request Example ===");
    let outcome = client
        .get(
            "https://jsonplaceholder.typicode.com/posts/1",
            Post::default(),
        )
        .await;

    println!("Success: {}", outcome.is_success());
    println!("Post ID: {}", outcome.value().id);
    println!("Title: {}", outcome.value().title);
    println!("Status code: {:?}", outcome.status());
    println!("Latency: {:?}", outcome.latency());
    println!();

    println!("=== POST Request Example ===");
    let new_post = NewPost {
        title: "My New Post".to_string(),
        body: "This is the content of my new post!".to_string(),
        user_id: 1,
    };

    let created = client
        .post(
            "https://jsonplaceholder.typicode.com/posts",
            &new_post,
            Post::default(),
        )
        .await;

    println!("Created post ID: {}", created.value().id);
    println!("Title: {}", created.value().title);
    println!("Status code: {:?}", created.status());
    println!();

    println!("=== A Call That Fails ===");
    // The fallback stands in for the value; the error says why.
    let missing = client
        .get(
            "https://jsonplaceholder.typicode.com/posts/does-not-exist",
            Post::default(),
        )
        .await;

    println!("Success: {}", missing.is_success());
    println!("Status code: {:?}", missing.status());
    if let Some(error) = missing.error() {
        println!("Error: {error}");
    }
    println!("Fallback post ID: {}", missing.value().id);

    Ok(())
}
