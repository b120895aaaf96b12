//! Implementations of the subcommands.

use std::fs;
use std::io::{self, Write as _};
use std::path::Path;

use anyhow::{Context as _, Result};
use exception_stream::{
    CallerVerifier, ExceptionNode, LogLine, TrustAll, TrustNone, decrypt_debug_value,
    encrypt_debug_value,
};

fn verifier(allowed: bool) -> &'static dyn CallerVerifier {
    if allowed { &TrustAll } else { &TrustNone }
}

pub fn decode(hex: &str, decrypt: bool, allowed: bool) -> Result<()> {
    let node = ExceptionNode::from_hex(hex.trim()).context("cannot decode exception stream")?;

    let mut out = io::stdout().lock();
    print_node(&mut out, &node, decrypt, allowed)?;
    out.flush()?;
    Ok(())
}

pub fn decode_log(path: &Path, decrypt: bool, allowed: bool) -> Result<()> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("cannot read log file {}", path.display()))?;

    let mut out = io::stdout().lock();
    let mut failed = 0usize;

    for (index, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }

        let number = index + 1;
        let node = match line.parse::<LogLine>().and_then(|l| l.decode()) {
            Ok(node) => node,
            Err(why) => {
                log::error!("skipping line {number} of {}: {why}", path.display());
                failed += 1;
                continue;
            },
        };

        writeln!(out, "--- line {number} ---")?;
        print_node(&mut out, &node, decrypt, allowed)?;
    }

    out.flush()?;

    if failed != 0 {
        log::warn!("{failed} lines of {} could not be decoded", path.display());
    }

    Ok(())
}

pub fn encrypt(text: &str) -> Result<()> {
    let value = encrypt_debug_value(text).context("cannot encrypt value")?;
    writeln!(io::stdout(), "{value}")?;
    Ok(())
}

pub fn decrypt(value: &str, allowed: bool) -> Result<()> {
    let plain = decrypt_debug_value(value.trim(), verifier(allowed))
        .context("cannot decrypt value")?;
    writeln!(io::stdout(), "{plain}")?;
    Ok(())
}

pub fn sample(eli: String, message: String) -> Result<()> {
    let inner = ExceptionNode::new("ELI00000", "Sample inner exception");
    let mut node = ExceptionNode::wrap(eli, message, inner);

    node.add_resolution("This exception was created by the sample command.");
    node.add_debug("Attempt", 1i32);
    node.add_encrypted_debug("Secret", "sample secret")?;
    node.capture_backtrace();

    let line = LogLine::from_node(&node).context("cannot serialize sample exception")?;
    writeln!(io::stdout(), "{line}")?;
    Ok(())
}

fn print_node(
    out: &mut impl io::Write,
    node: &ExceptionNode,
    decrypt: bool,
    allowed: bool,
) -> Result<()> {
    let context = node.context();
    writeln!(
        out,
        "{} {} on {} as {} (pid {})",
        context.app_name, context.app_version, context.machine_name, context.user_name, context.pid,
    )?;

    if let Some(time) = context.exception_time {
        writeln!(out, "time: {time}")?;
    }

    writeln!(out, "id: {}", context.exception_id)?;
    if context.file_id != 0 || context.action_id != 0 {
        writeln!(out, "file: {}, action: {}", context.file_id, context.action_id)?;
    }

    if !context.database_server.is_empty() || !context.database_name.is_empty() {
        writeln!(out, "database: {}/{}", context.database_server, context.database_name)?;
    }

    if !context.fps_context.is_empty() {
        writeln!(out, "fps context: {}", context.fps_context)?;
    }

    if !decrypt {
        write!(out, "{node}")?;
        return Ok(());
    }

    // print the chain by hand so each node's encrypted values can be replaced
    for (depth, node) in node.iter_chain().enumerate() {
        if depth != 0 {
            write!(out, "caused by: ")?;
        }

        writeln!(out, "{}: {}", node.eli_code(), node.message())?;
        for resolution in node.resolutions() {
            writeln!(out, "    resolution: {resolution}")?;
        }

        for entry in node.decrypted_debug_data(verifier(allowed))? {
            writeln!(out, "    {} = {}", entry.key, entry.value)?;
        }

        for frame in node.stack_trace() {
            writeln!(out, "    stack: {frame}")?;
        }
    }

    Ok(())
}
