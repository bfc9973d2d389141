use std::io::{self, Write, stdin};
use std::path::PathBuf;

use sand_sst::{SegmentReader, Value};

fn main() -> io::Result<()> {
    log_init::init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() != 2 {
        let program = args.first().map_or("cli", String::as_str);
        eprintln!("Usage: {program} <segment>");
        std::process::exit(1);
    }

    let path = PathBuf::from(&args[1]);

    let reader = match SegmentReader::open(&path) {
        Ok(reader) => reader,

        Err(e) => {
            eprintln!("Failed to open segment: {e}");
            std::process::exit(1);
        }
    };

    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let mut cmd = String::new();
        if stdin().read_line(&mut cmd)? == 0 {
            return Ok(());
        }
        let cmd = cmd.trim();

        if cmd.is_empty() {
            continue;
        }

        let parts: Vec<&str> = cmd.split_whitespace().collect();

        match parts[0] {
            "exit" => {
                return Ok(());
            }

            "get" => {
                if parts.len() != 2 {
                    eprintln!("Usage: get <key>");
                    continue;
                }

                match reader.get(parts[1]) {
                    Ok(Some(entry)) => match entry.value {
                        Value::Present(value) => {
                            eprintln!("{} (ts {})", String::from_utf8_lossy(&value), entry.ts)
                        }
                        Value::Tombstone => eprintln!("Key deleted (ts {})", entry.ts),
                    },
                    Ok(None) => eprintln!("Key not found"),
                    Err(e) => eprintln!("Failed to read key: {e}"),
                }
            }

            cmd => {
                eprintln!("Unknown command: {cmd}");
            }
        }
    }
}
