use nom::{
    IResult, Parser,
    bytes::complete::{tag, take_while1},
    character::complete::{char, digit1, space0, space1},
    combinator::{opt, recognize},
    sequence::{delimited, preceded, terminated},
};

use super::{KernelSample, ParseError, ParseResult};
use std::collections::HashMap;

/// Name of the synthetic span covering the whole kernel boot
pub const KERNEL_BOOT_NAME: &str = "k-boot";

/// A classified dmesg line
#[derive(Debug, Clone, PartialEq)]
pub enum DmesgEvent<'a> {
    /// `calling  foo+0x0/0x4 @ 1`
    Calling { func: &'a str },
    /// `initcall foo+0x0/0x4 returned 0 after 12 usecs`
    Returned { func: &'a str },
    /// Kernel has finished booting (freeing init memory)
    BootDone,
    /// Any other timestamped message
    Other,
}

/// Parse `[    0.123456] message` into (time in milliseconds, message)
pub fn parse_dmesg_line(line: &str) -> ParseResult<(f64, &str)> {
    let result: IResult<&str, &str> = delimited(
        (char('['), space0),
        recognize((digit1, opt((char('.'), digit1)))),
        (space0, char(']')),
    )
    .parse(line);

    let (message, seconds) = result
        .map_err(|e| ParseError::InvalidKernel(format!("Missing timestamp: {}", e)))?;

    let seconds: f64 = seconds
        .parse()
        .map_err(|_| ParseError::InvalidKernel(format!("Invalid timestamp: {}", seconds)))?;

    Ok((seconds * 1000.0, message.trim()))
}

/// Classify the message part of a dmesg line
pub fn classify_message(message: &str) -> DmesgEvent<'_> {
    if message.starts_with("Write protecting the") || message.starts_with("Freeing unused kernel memory")
    {
        return DmesgEvent::BootDone;
    }

    if let Ok((_, func)) = parse_initcall_func("calling", message) {
        return DmesgEvent::Calling { func };
    }
    if let Ok((_, func)) = parse_initcall_func("initcall", message) {
        return DmesgEvent::Returned { func };
    }

    DmesgEvent::Other
}

fn parse_initcall_func<'a>(keyword: &'static str, input: &'a str) -> IResult<&'a str, &'a str> {
    preceded(
        terminated(tag(keyword), space1),
        take_while1(|c: char| !c.is_whitespace()),
    )
    .parse(input)
}

/// Extract kernel initcall samples from dmesg output
///
/// Times are converted to centiseconds. A first timestamp above one second
/// is treated as a clock base: it is skipped and subtracted from every later
/// line.
pub fn parse_dmesg(content: &str) -> (Vec<KernelSample>, Vec<(usize, ParseError)>) {
    let mut errors = Vec::new();
    let mut calls: Vec<KernelSample> = Vec::new();
    let mut pending: HashMap<String, usize> = HashMap::new();
    let mut boot_end: Option<f64> = None;
    let mut base_ms: Option<f64> = None;
    let mut seen_first = false;

    for (idx, line) in content.lines().enumerate() {
        let Ok((mut time_ms, message)) = parse_dmesg_line(line) else {
            // Untimestamped lines are continuation text, not errors
            continue;
        };

        // Only the very first timestamped line can be a clock base
        let first = !seen_first;
        seen_first = true;
        if first && time_ms > 1000.0 {
            base_ms = Some(time_ms);
            continue;
        }
        if let Some(base) = base_ms {
            time_ms -= base;
        }
        let centis = time_ms / 10.0;

        match classify_message(message) {
            DmesgEvent::BootDone => boot_end = Some(centis),
            DmesgEvent::Calling { func } => {
                let name = func.split('+').next().unwrap_or(func).to_string();
                pending.insert(func.to_string(), calls.len());
                calls.push(KernelSample {
                    name,
                    start_time: centis,
                    duration: 0.0,
                });
            }
            DmesgEvent::Returned { func } => match pending.remove(func) {
                Some(call_idx) => {
                    let call = &mut calls[call_idx];
                    call.duration = (centis - call.start_time).max(0.0);
                }
                None => errors.push((
                    idx + 1,
                    ParseError::InvalidKernel(format!("Corrupted initcall for {}", func)),
                )),
            },
            DmesgEvent::Other => {}
        }
    }

    if calls.is_empty() && boot_end.is_none() {
        return (Vec::new(), errors);
    }

    let end = boot_end.unwrap_or_else(|| {
        calls
            .iter()
            .map(|c| c.start_time + c.duration)
            .fold(0.0, f64::max)
    });

    let mut samples = Vec::with_capacity(calls.len() + 1);
    samples.push(KernelSample {
        name: KERNEL_BOOT_NAME.to_string(),
        start_time: 0.0,
        duration: end,
    });
    samples.extend(calls);

    log::debug!("Parsed {} kernel samples from dmesg", samples.len());

    (samples, errors)
}
