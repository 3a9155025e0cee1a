use nom::{
    IResult, Parser,
    bytes::complete::{tag, take_till1, take_while1},
    character::complete::{char, digit1, space0, space1},
    combinator::{map_res, opt, recognize, rest},
    multi::separated_list1,
    sequence::{preceded, separated_pair, terminated},
};

use super::{ParseError, ParseResult};

/// Fields of a `/proc/<pid>/stat` line that the process tree needs
#[derive(Debug, Clone, PartialEq)]
pub struct StatRecord {
    pub pid: u32,
    pub comm: String,
    pub state: char,
    pub ppid: u32,
    pub utime: u64,
    pub stime: u64,
    pub start_time: u64,
}

/// One `time` + lines block of proc_ps.log
#[derive(Debug, Clone, PartialEq)]
pub struct TimedBlock<'a> {
    /// Sample time in centiseconds
    pub time: u64,
    pub lines: Vec<&'a str>,
}

/// Command line information from cmdline2.log
#[derive(Debug, Clone, PartialEq)]
pub struct CmdlineRecord {
    pub pid: u32,
    pub exe: String,
    pub args: Vec<String>,
}

// Field offsets counted from the state field (the first one after `comm`)
const PPID_FIELD: usize = 1;
const UTIME_FIELD: usize = 11;
const STIME_FIELD: usize = 12;
const STARTTIME_FIELD: usize = 19;

/// Parse a `key = value` header line
pub fn parse_header_line(line: &str) -> ParseResult<(String, String)> {
    let result: IResult<&str, (&str, &str)> = separated_pair(
        take_till1(|c: char| c == '='),
        (space0, char('='), space0),
        rest,
    )
    .parse(line);

    match result {
        Ok((_, (key, value))) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.trim().to_string()))
        }
        _ => Err(ParseError::InvalidFormat(format!(
            "Invalid header line: {}",
            line
        ))),
    }
}

/// Parse a single `/proc/<pid>/stat` line
pub fn parse_stat_line(line: &str) -> ParseResult<StatRecord> {
    let (rest, pid) = parse_u32(line.trim_start())
        .map_err(|e| ParseError::InvalidProcess(format!("Failed to parse PID: {}", e)))?;

    let (rest, comm) = parse_comm(rest)
        .map_err(|e| ParseError::InvalidProcess(format!("Failed to parse comm: {}", e)))?;

    let (_, fields) = preceded(space0, separated_list1(space1, parse_field))
        .parse(rest)
        .map_err(|e| ParseError::InvalidProcess(format!("Failed to parse fields: {}", e)))?;

    if fields.len() <= STARTTIME_FIELD {
        return Err(ParseError::InvalidProcess(format!(
            "Expected at least {} fields after comm, got {}",
            STARTTIME_FIELD + 1,
            fields.len()
        )));
    }

    let number = |idx: usize| -> ParseResult<u64> {
        fields[idx].parse().map_err(|_| {
            ParseError::InvalidProcess(format!("Field {} is not a number: {}", idx, fields[idx]))
        })
    };

    let ppid = u32::try_from(number(PPID_FIELD)?).map_err(|_| {
        ParseError::InvalidProcess(format!("PPID out of range: {}", fields[PPID_FIELD]))
    })?;

    Ok(StatRecord {
        pid,
        comm: comm.to_string(),
        state: fields[0].chars().next().unwrap_or('?'),
        ppid,
        utime: number(UTIME_FIELD)?,
        stime: number(STIME_FIELD)?,
        start_time: number(STARTTIME_FIELD)?,
    })
}

/// Split proc_ps.log (or any bootchart sampled log) into timed blocks
///
/// Blocks are separated by blank lines; the first line of each block is the
/// sample time. Blocks without a numeric time are reported and skipped.
pub fn parse_timed_blocks(content: &str) -> (Vec<TimedBlock<'_>>, Vec<(usize, ParseError)>) {
    let mut blocks = Vec::new();
    let mut errors = Vec::new();
    let mut current: Option<TimedBlock<'_>> = None;

    for (idx, line) in content.lines().enumerate() {
        let line_number = idx + 1;

        if line.trim().is_empty() {
            if let Some(block) = current.take() {
                blocks.push(block);
            }
            continue;
        }

        match current {
            Some(ref mut block) => block.lines.push(line),
            None => match parse_block_time(line) {
                Ok(time) => {
                    current = Some(TimedBlock {
                        time,
                        lines: Vec::new(),
                    })
                }
                Err(e) => errors.push((line_number, e)),
            },
        }
    }

    if let Some(block) = current {
        blocks.push(block);
    }

    (blocks, errors)
}

/// Parse one cmdline2.log block
///
/// Format:
/// ```text
/// 1234
/// :/usr/bin/foo
/// :foo\0--bar\0
/// ```
pub fn parse_cmdline_block(block: &str) -> ParseResult<CmdlineRecord> {
    let mut lines = block.lines();

    let pid_line = lines
        .next()
        .ok_or_else(|| ParseError::InvalidFormat("Empty cmdline block".to_string()))?;
    let (_, pid) = terminated(parse_u32, space0)
        .parse(pid_line.trim())
        .map_err(|e| ParseError::InvalidFormat(format!("Invalid cmdline PID: {}", e)))?;

    let exe = lines
        .next()
        .map(|l| l.trim_start_matches(':').to_string())
        .ok_or_else(|| ParseError::InvalidFormat(format!("Missing exe for PID {}", pid)))?;

    let args = lines
        .next()
        .map(|l| {
            l.trim_start_matches(':')
                .split('\0')
                .filter(|a| !a.is_empty())
                .map(str::to_string)
                .collect()
        })
        .ok_or_else(|| ParseError::InvalidFormat(format!("Missing args for PID {}", pid)))?;

    Ok(CmdlineRecord { pid, exe, args })
}

fn parse_block_time(line: &str) -> ParseResult<u64> {
    // Some collectors write fractional times; keep the integer part
    let result: IResult<&str, &str> =
        terminated(recognize(digit1), opt((char('.'), digit1))).parse(line.trim());

    match result {
        Ok(("", digits)) => digits
            .parse()
            .map_err(|_| ParseError::InvalidFormat(format!("Time out of range: {}", line))),
        _ => Err(ParseError::InvalidFormat(format!(
            "Expected sample time, got: {}",
            line
        ))),
    }
}

fn parse_u32(input: &str) -> IResult<&str, u32> {
    map_res(digit1, str::parse::<u32>).parse(input)
}

/// Parse `(comm)`; comm may itself contain spaces and parentheses, so it
/// extends to the last `)` of the line.
fn parse_comm(input: &str) -> IResult<&str, &str> {
    let (rest, _) = preceded(space1, tag("(")).parse(input)?;
    match rest.rfind(')') {
        Some(end) => Ok((&rest[end + 1..], &rest[..end])),
        None => Err(nom::Err::Error(nom::error::Error::new(
            rest,
            nom::error::ErrorKind::Char,
        ))),
    }
}

fn parse_field(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| !c.is_whitespace())(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    const INIT_STAT: &str = "1 (init) S 0 1 1 0 -1 4219136 1063 12891 12 23 7 31 58 23 20 0 1 0 2 3428352 208 18446744073709551615 1 1 0 0 0 0 0 4096 536962595 0 0 0 17 0 0 0 0 0 0";

    #[test]
    fn test_parse_stat_line() {
        let record = parse_stat_line(INIT_STAT).unwrap();

        assert_eq!(record.pid, 1);
        assert_eq!(record.comm, "init");
        assert_eq!(record.state, 'S');
        assert_eq!(record.ppid, 0);
        assert_eq!(record.utime, 7);
        assert_eq!(record.stime, 31);
        assert_eq!(record.start_time, 2);
    }

    #[test]
    fn test_parse_stat_line_comm_with_spaces() {
        let line = "412 (udev worker (3)) R 1 412 412 0 -1 4202816 0 0 0 0 5 9 0 0 20 0 1 0 150 0 0";
        let record = parse_stat_line(line).unwrap();

        assert_eq!(record.pid, 412);
        assert_eq!(record.comm, "udev worker (3)");
        assert_eq!(record.state, 'R');
        assert_eq!(record.ppid, 1);
        assert_eq!(record.utime, 5);
        assert_eq!(record.stime, 9);
        assert_eq!(record.start_time, 150);
    }

    #[test]
    fn test_parse_stat_line_too_short() {
        let err = parse_stat_line("12 (sh) S 1 12 12").unwrap_err();
        assert!(matches!(err, ParseError::InvalidProcess(_)));
    }

    #[test]
    fn test_parse_stat_line_ppid_out_of_range() {
        // 2^32 + 1 would wrap to 1 if truncated
        let line = "12 (sh) S 4294967297 12 12 0 -1 0 0 0 0 0 3 1 0 0 20 0 1 0 150 0 0";
        let err = parse_stat_line(line).unwrap_err();
        assert!(matches!(err, ParseError::InvalidProcess(_)));
    }

    #[test]
    fn test_parse_stat_line_missing_comm() {
        assert!(parse_stat_line("12 sh S 1").is_err());
    }

    #[test]
    fn test_parse_header_line() {
        let (key, value) = parse_header_line("title = Boot chart for host (Mon Jan 1)").unwrap();
        assert_eq!(key, "title");
        assert_eq!(value, "Boot chart for host (Mon Jan 1)");

        let (key, value) = parse_header_line("system.kernel=6.1.0").unwrap();
        assert_eq!(key, "system.kernel");
        assert_eq!(value, "6.1.0");

        assert!(parse_header_line("= value").is_err());
        assert!(parse_header_line("no separator").is_err());
    }

    #[test]
    fn test_parse_timed_blocks() {
        let content = "100\nline a\nline b\n\n120\nline c\n\n\nbogus\n140\n";
        let (blocks, errors) = parse_timed_blocks(content);

        assert_eq!(blocks.len(), 3);
        assert_eq!(blocks[0].time, 100);
        assert_eq!(blocks[0].lines, vec!["line a", "line b"]);
        assert_eq!(blocks[1].time, 120);
        assert_eq!(blocks[1].lines, vec!["line c"]);
        assert_eq!(blocks[2].time, 140);
        assert!(blocks[2].lines.is_empty());

        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].0, 9);
    }

    #[test]
    fn test_parse_timed_blocks_fractional_time() {
        let (blocks, errors) = parse_timed_blocks("512.37\n1 (init) S\n");
        assert!(errors.is_empty());
        assert_eq!(blocks[0].time, 512);
    }

    #[test]
    fn test_parse_cmdline_block() {
        let block = "231\n:/usr/sbin/sshd\n:/usr/sbin/sshd\0-D\0-f\0/etc/ssh/sshd_config\0";
        let record = parse_cmdline_block(block).unwrap();

        assert_eq!(record.pid, 231);
        assert_eq!(record.exe, "/usr/sbin/sshd");
        assert_eq!(
            record.args,
            vec!["/usr/sbin/sshd", "-D", "-f", "/etc/ssh/sshd_config"]
        );
    }

    #[test]
    fn test_parse_cmdline_block_missing_args() {
        assert!(parse_cmdline_block("231\n:/usr/sbin/sshd").is_err());
        assert!(parse_cmdline_block("abc\n:x\n:y").is_err());
    }
}
