use clap::Parser;
use dotenvy::dotenv;
use fitlearn_backend::config::AppConfig;
use fitlearn_backend::infrastructure::{database, seed};
use fitlearn_backend::models::Role;
use fitlearn_backend::utils::auth::create_jwt;

/// Development helper: ensures a user exists and prints a bearer token for it.
#[derive(Parser, Debug)]
#[command(version, about = "Issue a development JWT for a (possibly new) user")]
struct Args {
    /// Username to sign in as; created when missing
    #[arg(short, long)]
    username: String,

    /// Role for a newly created user: admin, instructor or learner
    #[arg(short, long, default_value = "learner")]
    role: Role,

    /// Token lifetime in hours
    #[arg(long, default_value_t = 24)]
    hours: i64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    let args = Args::parse();
    let config = AppConfig::from_env();

    let db = database::setup_database().await?;
    let user = seed::ensure_user(&db, &args.username, args.role).await?;
    let token = create_jwt(
        &user.id,
        &config.jwt_secret,
        chrono::Duration::hours(args.hours),
    )?;

    eprintln!("user {} ({}) id={}", user.username, user.role, user.id);
    println!("{}", token);
    Ok(())
}
