use std::net::SocketAddr;
use std::path::PathBuf;

use rand::Rng;
use tracing::warn;

pub struct Config {
    pub host: String,
    pub port: u16,
    pub data_dir: PathBuf,
    pub pfp_dir: PathBuf,
    pub session_secret: Vec<u8>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let host = std::env::var("CHATSITE_HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let port: u16 = std::env::var("CHATSITE_PORT")
            .unwrap_or_else(|_| "5000".into())
            .parse()?;
        let data_dir: PathBuf = std::env::var("CHATSITE_DATA_DIR")
            .unwrap_or_else(|_| "data".into())
            .into();
        let pfp_dir: PathBuf = std::env::var("CHATSITE_PFP_DIR")
            .unwrap_or_else(|_| "pfp".into())
            .into();

        let session_secret = match std::env::var("CHATSITE_SESSION_SECRET") {
            Ok(secret) if !secret.is_empty() => secret.into_bytes(),
            _ => {
                warn!("CHATSITE_SESSION_SECRET is unset; using a random key, sessions end on restart");
                let mut secret = vec![0u8; 32];
                rand::rng().fill(&mut secret[..]);
                secret
            }
        };

        Ok(Self {
            host,
            port,
            data_dir,
            pfp_dir,
            session_secret,
        })
    }

    pub fn addr(&self) -> anyhow::Result<SocketAddr> {
        Ok(format!("{}:{}", self.host, self.port).parse()?)
    }
}
