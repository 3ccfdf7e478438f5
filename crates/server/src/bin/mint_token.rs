//! Sign a bearer token for a player, for local play without the account
//! service.
//!
//! Usage: cargo run --bin mint-token -- [player-id] [hours]
//!
//! Uses JWT_SECRET_KEY from the environment, like the server.

use server::auth::jwt::create_token;
use server::config::Config;
use server::model::PlayerId;

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Config::from_env();

    let mut args = std::env::args().skip(1);
    let player = match args.next() {
        Some(text) => text.parse::<PlayerId>()?,
        None => PlayerId::new(),
    };
    let hours = match args.next() {
        Some(text) => text.parse::<i64>()?,
        None => 24,
    };

    let token = create_token(player, &config.jwt_secret, hours)?;
    eprintln!("player {player}, valid for {hours}h");
    println!("{token}");
    Ok(())
}
