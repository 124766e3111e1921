mod app;
mod core;
mod data;
mod domain;
mod utils;

use app::App;

#[tokio::main]
async fn main() {
    if let Err(e) = App::run().await {
        eprintln!("\nError: {e:#}\n");
        std::process::exit(1);
    }
}
