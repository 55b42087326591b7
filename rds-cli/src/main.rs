//! rds-cli: decode RDS captures and resolve TMC locations.

use std::io::{self, Read};
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use clap::{Parser, Subcommand};
use comfy_table::{Cell, Table};

use rds_core::{RdsDecoder, Snapshot, SnapshotPublisher};
use rds_locate::LocationResolver;

#[derive(Parser)]
#[command(
    name = "rds",
    version,
    about = "RDS/RBDS group decoder and TMC location resolver"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decode a capture of RDS groups (hex tuples and/or JSON records)
    Decode {
        /// Path to capture file, or '-' for stdin
        file: PathBuf,

        /// Print every raw group before the summary
        #[arg(short, long)]
        raw: bool,

        /// Collect and print group-type statistics
        #[arg(short, long)]
        analyzer: bool,

        /// Disable TMC ingestion
        #[arg(long)]
        no_tmc: bool,

        /// Dump the final snapshot as JSON instead of tables
        #[arg(long)]
        json: bool,
    },

    /// Resolve TMC location codes to coordinates
    Resolve {
        /// Location codes (LCDs)
        #[arg(required = true)]
        lcds: Vec<u32>,

        /// Country identifier
        #[arg(long)]
        cid: u16,

        /// Location table number
        #[arg(long)]
        tabcd: u16,

        /// Directory holding local tmc/{cid}_{tabcd}.json tables
        #[arg(long, default_value = "data")]
        data_dir: PathBuf,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Decode {
            file,
            raw,
            analyzer,
            no_tmc,
            json,
        } => cmd_decode(file, raw, analyzer, no_tmc, json),
        Commands::Resolve {
            lcds,
            cid,
            tabcd,
            data_dir,
        } => cmd_resolve(lcds, cid, tabcd, data_dir).await,
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

fn cmd_decode(file: PathBuf, raw: bool, analyzer: bool, no_tmc: bool, json: bool) {
    let data = if file.to_str() == Some("-") {
        let mut buf = Vec::new();
        if let Err(e) = io::stdin().lock().read_to_end(&mut buf) {
            eprintln!("Error reading stdin: {e}");
            std::process::exit(1);
        }
        buf
    } else {
        std::fs::read(&file).unwrap_or_else(|e| {
            eprintln!("Error opening {}: {e}", file.display());
            std::process::exit(1);
        })
    };

    let mut decoder = RdsDecoder::new();
    decoder.set_analyzer_active(analyzer);
    if no_tmc {
        decoder.set_tmc_active(false);
    }

    for chunk in data.chunks(4096) {
        decoder.push_bytes(chunk, now_ms());
    }

    let mut publisher = SnapshotPublisher::new();
    let snapshot = match publisher.tick(&mut decoder) {
        Some(s) => s,
        None => {
            eprintln!("No RDS groups found in {}", file.display());
            std::process::exit(1);
        }
    };

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&snapshot).unwrap_or_else(|_| "{}".into())
        );
        return;
    }

    if raw {
        for g in &snapshot.recent_groups {
            println!(
                "{} {} {:04X} {:04X} {:04X} {:04X}",
                g.time, g.group, g.blocks[0], g.blocks[1], g.blocks[2], g.blocks[3]
            );
        }
        println!();
    }

    eprintln!(
        "Decoded {} groups (BER {:.1}%)",
        snapshot.recent_groups.len(),
        snapshot.ber
    );
    print_station(&snapshot);

    if analyzer {
        print_analyzer(&snapshot);
    }
    if !snapshot.tmc_messages.is_empty() {
        print_tmc(&snapshot);
    }
}

fn print_station(s: &Snapshot) {
    let yes_no = |b: bool| if b { "yes" } else { "no" };

    let mut table = Table::new();
    table.set_header(vec!["Field", "Value"]);
    table.add_row(vec![
        Cell::new("PI"),
        Cell::new(s.pi.as_deref().unwrap_or("-")),
    ]);
    table.add_row(vec![Cell::new("PS"), Cell::new(&s.ps)]);
    if !s.lps.is_empty() {
        table.add_row(vec![Cell::new("Long PS"), Cell::new(&s.lps)]);
    }
    table.add_row(vec![Cell::new("RT"), Cell::new(&s.rt)]);
    if !s.ptyn.is_empty() {
        table.add_row(vec![Cell::new("PTYN"), Cell::new(&s.ptyn)]);
    }
    table.add_row(vec![
        Cell::new("PTY"),
        Cell::new(format!("{} ({})", s.pty, s.pty_name)),
    ]);
    table.add_row(vec![
        Cell::new("TP/TA/MS"),
        Cell::new(format!("{}/{}/{}", yes_no(s.tp), yes_no(s.ta), yes_no(s.ms))),
    ]);
    if let Some(ecc) = &s.ecc {
        table.add_row(vec![Cell::new("ECC"), Cell::new(ecc)]);
    }
    if let Some(lic) = &s.lic {
        table.add_row(vec![Cell::new("LIC"), Cell::new(lic)]);
    }
    if let Some(pin) = &s.pin {
        table.add_row(vec![
            Cell::new("PIN"),
            Cell::new(format!("day {} {:02}:{:02}", pin.day, pin.hour, pin.minute)),
        ]);
    }
    if let Some(utc) = &s.utc_time {
        table.add_row(vec![Cell::new("Clock (UTC)"), Cell::new(utc)]);
    }
    if let Some(local) = &s.local_time {
        table.add_row(vec![Cell::new("Clock (local)"), Cell::new(local)]);
    }
    if !s.af_list.is_empty() {
        let list: Vec<String> = s.af_list.iter().map(|f| f.to_string()).collect();
        table.add_row(vec![
            Cell::new(format!("AF ({:?})", s.af_method)),
            Cell::new(list.join(", ")),
        ]);
    }
    if !s.rt_plus_tags.is_empty() {
        let tags: Vec<String> = s
            .rt_plus_tags
            .iter()
            .map(|t| format!("{}={}", t.label, t.text))
            .collect();
        table.add_row(vec![Cell::new("RT+"), Cell::new(tags.join(", "))]);
    }
    if !s.eon_networks.is_empty() {
        let eon: Vec<String> = s
            .eon_networks
            .iter()
            .map(|n| format!("{} {}", n.pi, n.ps))
            .collect();
        table.add_row(vec![Cell::new("EON"), Cell::new(eon.join("; "))]);
    }
    if let Some(svc) = &s.tmc_service {
        table.add_row(vec![
            Cell::new("TMC service"),
            Cell::new(format!(
                "LTN {} SID {} {}",
                svc.ltn, svc.sid, svc.provider_name
            )),
        ]);
    }

    println!("{table}");
}

fn print_analyzer(s: &Snapshot) {
    println!();
    println!("Group statistics ({} groups):", s.group_total);

    let mut table = Table::new();
    table.set_header(vec!["Group", "Count", "Share"]);
    for (name, count) in &s.group_counts {
        let share = if s.group_total > 0 {
            100.0 * *count as f64 / s.group_total as f64
        } else {
            0.0
        };
        table.add_row(vec![
            Cell::new(name),
            Cell::new(count),
            Cell::new(format!("{share:.1}%")),
        ]);
    }
    println!("{table}");

    let tail: Vec<String> = s
        .group_sequence
        .iter()
        .rev()
        .take(24)
        .rev()
        .cloned()
        .collect();
    if !tail.is_empty() {
        println!("Sequence tail: {}", tail.join(" "));
    }
}

fn print_tmc(s: &Snapshot) {
    println!();
    println!("TMC messages ({}):", s.tmc_messages.len());

    let mut table = Table::new();
    table.set_header(vec![
        "Location", "Event", "Extent", "Dir", "Duration", "Updates",
    ]);
    for m in &s.tmc_messages {
        table.add_row(vec![
            Cell::new(m.location_code),
            Cell::new(m.event_code),
            Cell::new(m.extent),
            Cell::new(if m.direction { "-" } else { "+" }),
            Cell::new(m.duration_label),
            Cell::new(m.update_count),
        ]);
    }
    println!("{table}");
}

async fn cmd_resolve(lcds: Vec<u32>, cid: u16, tabcd: u16, data_dir: PathBuf) {
    let resolver = LocationResolver::new(&data_dir);

    eprintln!(
        "Resolving {} location codes for table {cid}:{tabcd}...",
        lcds.len()
    );
    let map = match resolver.resolve(&lcds, cid, tabcd).await {
        Ok(map) => map,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    let mut table = Table::new();
    table.set_header(vec!["LCD", "Status", "Lat", "Lon", "Name", "Road", "Prev", "Next"]);

    let mut sorted: Vec<u32> = map.keys().copied().collect();
    sorted.sort_unstable();
    for lcd in sorted {
        let loc = &map[&lcd];
        if loc.is_resolved() {
            table.add_row(vec![
                Cell::new(lcd),
                Cell::new("resolved"),
                Cell::new(format!("{:.5}", loc.lat)),
                Cell::new(format!("{:.5}", loc.lon)),
                Cell::new(loc.name.as_deref().unwrap_or("-")),
                Cell::new(loc.road_ref.as_deref().unwrap_or("-")),
                Cell::new(loc.prev_lcd.map(|v| v.to_string()).unwrap_or("-".into())),
                Cell::new(loc.next_lcd.map(|v| v.to_string()).unwrap_or("-".into())),
            ]);
        } else {
            table.add_row(vec![
                Cell::new(lcd),
                Cell::new("not found"),
                Cell::new("-"),
                Cell::new("-"),
                Cell::new("-"),
                Cell::new("-"),
                Cell::new("-"),
                Cell::new("-"),
            ]);
        }
    }

    println!("{table}");
    eprintln!("{} entries cached this session", resolver.cache_size());
}
