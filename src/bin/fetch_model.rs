//! fetch_model - download an ONNX model file for the tract backend
//!
//! Streams the download to disk with a progress bar when the server reports
//! a length. Refuses to overwrite an existing file unless forced.

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::fs;
use std::io::{Read, Write};
use std::path::PathBuf;
use url::Url;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Model URL (http or https).
    url: String,
    /// Destination file path.
    #[arg(long, default_value = "model.onnx")]
    out: PathBuf,
    /// Overwrite an existing destination file.
    #[arg(long, default_value_t = false)]
    force: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let url = Url::parse(&args.url).with_context(|| format!("invalid url '{}'", args.url))?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(anyhow!("unsupported url scheme '{}'", url.scheme()));
    }
    if args.out.exists() && !args.force {
        return Err(anyhow!(
            "{} already exists, pass --force to overwrite",
            args.out.display()
        ));
    }

    let response = ureq::get(url.as_str())
        .call()
        .with_context(|| format!("fetch {}", url))?;
    let total: Option<u64> = response
        .header("Content-Length")
        .and_then(|len| len.parse().ok());

    let bar = match total {
        Some(total) => {
            let bar = ProgressBar::new(total);
            bar.set_style(
                ProgressStyle::with_template("{msg} [{bar:30}] {bytes}/{total_bytes}")
                    .unwrap_or_else(|_| ProgressStyle::default_bar()),
            );
            bar.set_message("downloading");
            bar
        }
        None => ProgressBar::new_spinner(),
    };

    let mut reader = response.into_reader();
    let tmp_path = args.out.with_extension("part");
    let mut out = fs::File::create(&tmp_path)
        .with_context(|| format!("create {}", tmp_path.display()))?;

    let mut buf = [0u8; 64 * 1024];
    let mut written = 0u64;
    loop {
        let n = reader.read(&mut buf).context("read response body")?;
        if n == 0 {
            break;
        }
        out.write_all(&buf[..n]).context("write model file")?;
        written += n as u64;
        bar.set_position(written);
    }
    out.flush()?;
    drop(out);
    fs::rename(&tmp_path, &args.out)
        .with_context(|| format!("move model into place at {}", args.out.display()))?;
    bar.finish_and_clear();

    log::info!("wrote {} bytes to {}", written, args.out.display());
    println!("{}", args.out.display());
    Ok(())
}
