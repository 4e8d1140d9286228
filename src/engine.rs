// src/engine.rs
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::info;

use crate::bencode::{bvalue_to_json, decode};
use crate::config::{Config, DEFAULT_CONFIG_PATH};
use crate::torrent::Torrent;

#[derive(Debug, Parser)]
#[command(name = "rusbit-meta", version, about = "Inspect bencoded values and .torrent files")]
pub struct Cli {
    /// Path of the TOML config file
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Decode a bencoded string and print it as JSON
    Decode { bencoded: String },
    /// Print the metadata of a .torrent file
    Info { torrent: PathBuf },
    /// Print a magnet URI for a .torrent file
    Magnet { torrent: PathBuf },
    /// Write the default config to the config path
    InitConfig,
}

pub fn use_command<W: Write>(cli: &Cli, config: &Config, out: &mut W) -> Result<()> {
    match &cli.command {
        Command::Decode { bencoded } => {
            let value = decode(bencoded.as_bytes()).context("Failed to decode input")?;
            writeln!(out, "{}", serde_json::to_string(&bvalue_to_json(&value))?)?;
        }
        Command::Info { torrent } => {
            let torrent = load_torrent(torrent)?;
            print_info(&torrent, config, out)?;
        }
        Command::Magnet { torrent } => {
            let torrent = load_torrent(torrent)?;
            writeln!(out, "{}", torrent.magnet_uri())?;
        }
        Command::InitConfig => {
            Config::default()
                .save(&cli.config)
                .map_err(|e| anyhow::anyhow!(e))
                .with_context(|| format!("Failed to write {}", cli.config.display()))?;
            info!("Wrote default config to {}", cli.config.display());
        }
    }
    Ok(())
}

/// Writes a failed command's error, with its context chain, as one line.
pub fn report_error<W: Write>(err: &anyhow::Error, out: &mut W) -> std::io::Result<()> {
    writeln!(out, "Error: {:#}", err)
}

fn load_torrent(path: &Path) -> Result<Torrent> {
    let torrent = Torrent::from_file(path)
        .with_context(|| format!("Error reading torrent {}", path.display()))?;
    info!("Loaded torrent {} from {}", torrent.content_hash(), path.display());
    Ok(torrent)
}

fn print_info<W: Write>(torrent: &Torrent, config: &Config, out: &mut W) -> Result<()> {
    writeln!(out, "Info Hash: {}", torrent.content_hash())?;
    writeln!(out, "Tracker URL: {}", torrent.announce())?;
    for tracker in torrent.announce_list() {
        writeln!(out, "Tracker: {}", tracker)?;
    }
    if let Some(name) = torrent.name() {
        writeln!(out, "Name: {}", name)?;
    }
    if let Some(comment) = torrent.comment() {
        writeln!(out, "Comment: {}", comment)?;
    }
    if let Some(created_by) = torrent.created_by() {
        writeln!(out, "Created By: {}", created_by)?;
    }
    if let Some(date) = torrent.creation_date() {
        writeln!(out, "Creation Date: {}", date.to_rfc3339())?;
    }
    writeln!(out, "Private: {}", torrent.is_private())?;
    writeln!(out, "Length: {}", torrent.length())?;
    writeln!(out, "Piece Length: {}", torrent.piece_length())?;
    writeln!(out, "Number of Pieces: {}", torrent.piece_count())?;

    if config.show_files {
        for file in torrent.files() {
            writeln!(
                out,
                "File: {} ({} bytes at {}..{})",
                file.relative_path().display(),
                file.length,
                file.range.start,
                file.range.end
            )?;
        }
    }

    if config.show_piece_hashes {
        for piece_hash in torrent.piece_hashes() {
            writeln!(out, "{}", piece_hash)?;
        }
    }
    Ok(())
}
