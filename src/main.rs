use clap::{Parser, Subcommand};

use jwkmint::commands::{
    jwk::{handle_jwk, ArgsJwk},
    jwks::{handle_jwks, ArgsJwks},
    sign::{handle_sign, ArgsSign},
    verify::{handle_verify, ArgsVerify},
};

#[derive(Parser)]
#[command(
    name = "jwkmint",
    about = "Build JSON Web Keys from PEM keys and sign JSON Web Tokens",
    author = "jwkmint contributors",
    version = env!("CARGO_PKG_VERSION"),
    propagate_version = true
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the JWK for a PEM public key
    Jwk(ArgsJwk),

    /// Print a JWK set for the keys listed in a manifest
    Jwks(ArgsJwks),

    /// Sign JSON claims with a PEM private key
    Sign(ArgsSign),

    /// Verify a JWT token's signature with a PEM key
    Verify(ArgsVerify),
}

fn main() -> color_eyre::Result<()> {
    // Initialize color-eyre for better error reporting
    color_eyre::install()?;

    // Logs go to stderr so stdout only carries command output
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::Jwk(args) => handle_jwk(args)?,
        Commands::Jwks(args) => handle_jwks(args)?,
        Commands::Sign(args) => handle_sign(args)?,
        Commands::Verify(args) => handle_verify(args)?,
    }

    Ok(())
}
