use std::collections::BTreeSet;
use std::io::{self, BufWriter, Write};
use std::process;

use anyhow::Context;
use clap::Parser;

use xmlmask::charclass::{self, CharClass, XmlVersion};
use xmlmask::common::io::read_input;
use xmlmask::common::{io_error_msg, reset_sigpipe};
use xmlmask::mask::{self, IncorrectCharPolicy, format_code_points};

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

const TOOL: &str = "xmlmask";

#[derive(Parser)]
#[command(
    name = "xmlmask",
    version,
    about = "Escape text for safe inclusion in an XML document"
)]
struct Cli {
    /// XML version of the target document (1.0 or 1.1)
    #[arg(long = "xml-version", value_name = "VERSION", default_value = "1.0")]
    xml_version: XmlVersion,

    /// Where the text will be written: element-name, attribute-name,
    /// attribute-value, text or cdata
    #[arg(short = 'c', long = "class", value_name = "CLASS", default_value = "text")]
    class: CharClass,

    /// Escape without scanning for invalid characters
    #[arg(long = "no-check")]
    no_check: bool,

    /// Report invalid characters on stderr
    #[arg(short = 'r', long = "report")]
    report: bool,

    /// Delete control characters when invalid characters are found
    #[arg(short = 's', long = "strip")]
    strip: bool,

    /// Print the byte length of the masked text instead of the text
    #[arg(short = 'l', long = "length")]
    length: bool,

    /// Print each distinct invalid character as U+XXXX; exit 1 if any
    #[arg(long = "list-invalid", conflicts_with = "length")]
    list_invalid: bool,

    /// Files to process; `-` or none reads stdin
    files: Vec<String>,
}

/// Returns the I/O error behind a failed write, if any.
fn io_cause(e: &anyhow::Error) -> Option<&io::Error> {
    e.chain().find_map(|c| c.downcast_ref::<io::Error>())
}

/// Mask, measure or list one input. Returns true if invalid characters
/// were listed.
fn process_text(
    cli: &Cli,
    name: &str,
    text: &str,
    show_names: bool,
    out: &mut impl Write,
) -> anyhow::Result<bool> {
    let version = cli.xml_version;
    let class = cli.class;

    if cli.list_invalid {
        let found = charclass::invalid_chars(version, class, text);
        for c in &found {
            if show_names {
                write!(out, "{name}: ")?;
            }
            writeln!(out, "U+{:04X}", *c as u32)?;
        }
        return Ok(!found.is_empty());
    }

    let report = |_: &str, invalid: &BTreeSet<char>| {
        eprintln!(
            "{TOOL}: {name}: {} invalid character(s): {}",
            invalid.len(),
            format_code_points(invalid)
        );
    };
    let policy =
        IncorrectCharPolicy::new(!cli.no_check, cli.report, cli.strip).with_notifier(&report);

    if cli.length {
        let len = mask::masked_xml_text_len(version, class, policy, text);
        if show_names {
            writeln!(out, "{len} {name}")?;
        } else {
            writeln!(out, "{len}")?;
        }
    } else {
        mask::mask_xml_text_to(version, class, policy, text, out)
            .with_context(|| format!("masking {name}"))?;
    }
    Ok(false)
}

fn main() {
    reset_sigpipe();

    let cli = Cli::parse();

    if !cli.no_check || cli.list_invalid {
        charclass::init();
    }

    let files = if cli.files.is_empty() {
        vec!["-".to_string()]
    } else {
        cli.files.clone()
    };
    let show_names = files.len() > 1;

    let stdout = io::stdout();
    let mut out = BufWriter::with_capacity(256 * 1024, stdout.lock());
    let mut had_error = false;
    let mut found_invalid = false;

    for name in &files {
        let data = match read_input(name) {
            Ok(d) => d,
            Err(e) => {
                eprintln!("{TOOL}: {name}: {}", io_error_msg(&e));
                had_error = true;
                continue;
            }
        };
        let text = match data.as_str() {
            Ok(t) => t,
            Err(e) => {
                eprintln!(
                    "{TOOL}: {name}: invalid UTF-8 after byte {}",
                    e.valid_up_to()
                );
                had_error = true;
                continue;
            }
        };

        match process_text(&cli, name, text, show_names, &mut out) {
            Ok(listed) => found_invalid |= listed,
            Err(e) => match io_cause(&e) {
                Some(io_err) if io_err.kind() == io::ErrorKind::BrokenPipe => process::exit(0),
                Some(io_err) => {
                    eprintln!("{TOOL}: write error: {}", io_error_msg(io_err));
                    process::exit(1);
                }
                None => {
                    eprintln!("{TOOL}: {e:#}");
                    had_error = true;
                }
            },
        }
    }

    if let Err(e) = out.flush() {
        if e.kind() == io::ErrorKind::BrokenPipe {
            process::exit(0);
        }
        eprintln!("{TOOL}: write error: {}", io_error_msg(&e));
        had_error = true;
    }

    if had_error || found_invalid {
        process::exit(1);
    }
}
