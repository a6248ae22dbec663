use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

#[derive(Parser, Debug)]
#[command(name = "tessera", version, about = "Tessera token CLI")]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Key pair management
    Keys {
        #[command(subcommand)]
        cmd: KeysCommand,
    },

    /// Token issuance and verification
    Token {
        #[command(subcommand)]
        cmd: TokenCommand,
    },
}

#[derive(Subcommand, Debug)]
enum KeysCommand {
    /// Generate the key pair if neither key file exists yet.
    Generate {
        /// Path for the private key file
        #[arg(long, env = "TESSERA_PRIVATE_KEY_PATH", default_value = "keys/private.pem")]
        private: PathBuf,

        /// Path for the public key file
        #[arg(long, env = "TESSERA_PUBLIC_KEY_PATH", default_value = "keys/public.pem")]
        public: PathBuf,
    },
}

#[derive(Subcommand, Debug)]
enum TokenCommand {
    /// Mint a signed token.
    Issue {
        #[arg(long, env = "TESSERA_PRIVATE_KEY_PATH", default_value = "keys/private.pem")]
        private: PathBuf,

        #[arg(long, env = "TESSERA_PUBLIC_KEY_PATH", default_value = "keys/public.pem")]
        public: PathBuf,

        /// Intended audience (e.g. a service name)
        #[arg(long)]
        audience: String,

        /// Issuing party
        #[arg(long)]
        issuer: String,

        /// Time to live: "90s", "30m", "24h", "7d", or bare milliseconds
        #[arg(long, default_value = "1h")]
        ttl: String,

        /// Claim as key=value; values parse as JSON when possible (repeatable)
        #[arg(long = "claim")]
        claims: Vec<String>,

        /// Write the token here instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Verify a token's digest and signature.
    Verify {
        #[arg(long, env = "TESSERA_PRIVATE_KEY_PATH", default_value = "keys/private.pem")]
        private: PathBuf,

        #[arg(long, env = "TESSERA_PUBLIC_KEY_PATH", default_value = "keys/public.pem")]
        public: PathBuf,

        /// Token string, or path to a file containing one
        #[arg(long)]
        token: String,
    },

    /// Decode a token without verifying it.
    Inspect {
        /// Token string, or path to a file containing one
        token: String,
    },

    /// Verify a token, then re-sign its claims under a fresh expiry.
    Renew {
        #[arg(long, env = "TESSERA_PRIVATE_KEY_PATH", default_value = "keys/private.pem")]
        private: PathBuf,

        #[arg(long, env = "TESSERA_PUBLIC_KEY_PATH", default_value = "keys/public.pem")]
        public: PathBuf,

        /// Token string, or path to a file containing one
        #[arg(long)]
        token: String,

        #[arg(long)]
        audience: String,

        #[arg(long)]
        issuer: String,

        #[arg(long, default_value = "1h")]
        ttl: String,

        /// Write the renewed token here instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    let cli = Cli::parse();

    match cli.cmd {
        Command::Keys { cmd } => match cmd {
            KeysCommand::Generate { private, public } => commands::keys::generate(private, public),
        },

        Command::Token { cmd } => match cmd {
            TokenCommand::Issue {
                private,
                public,
                audience,
                issuer,
                ttl,
                claims,
                output,
            } => commands::token::issue(private, public, &audience, &issuer, &ttl, claims, output),

            TokenCommand::Verify {
                private,
                public,
                token,
            } => commands::token::verify(private, public, &token),

            TokenCommand::Inspect { token } => commands::token::inspect(&token),

            TokenCommand::Renew {
                private,
                public,
                token,
                audience,
                issuer,
                ttl,
                output,
            } => commands::token::renew(private, public, &token, &audience, &issuer, &ttl, output),
        },
    }
}
