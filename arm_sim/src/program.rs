//! Motion program loading and time indexing.
//!
//! A motion program is a tab-delimited table replayed in a loop. The first
//! line is a header; each following line holds five columns:
//!
//! ```text
//! pose            joints          laser  suction  gripper
//! [200, 0, 50, 0] [0, 30, 40, 0]  1      0        0
//! ```
//!
//! Pose and joint cells are bracketed lists of exactly four numbers. The
//! parser is strict: any malformed row fails the whole load.

use arm_common::config::ProgramConfig;
use arm_common::consts::{POSE_COORDS, POSE_JOINTS};
use arm_common::types::Pose;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

/// Number of columns in a program row.
const ROW_COLUMNS: usize = 5;

/// Errors raised while loading a motion program.
#[derive(Debug, Error)]
pub enum ProgramError {
    /// Program file unreadable
    #[error("cannot read program file {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Row does not decode to the expected shape
    #[error("line {line}: {reason}")]
    Parse { line: usize, reason: String },

    /// No data rows after the header
    #[error("program has no samples")]
    Empty,

    /// Cycle duration not a positive finite number
    #[error("invalid program duration: {0}")]
    InvalidDuration(f64),
}

/// One row of a motion program.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub pose: Pose,
    pub laser: f64,
    pub suction_cup: f64,
    pub gripper: f64,
}

/// Immutable, time-indexed table of samples.
#[derive(Debug, Clone)]
pub struct MotionProgram {
    id: u32,
    samples: Vec<Sample>,
    duration_s: f64,
    sample_period_s: f64,
}

impl MotionProgram {
    /// Build a program from parsed samples.
    ///
    /// # Errors
    /// `Empty` if there are no samples, `InvalidDuration` if `duration_s`
    /// is not strictly positive.
    pub fn new(id: u32, samples: Vec<Sample>, duration_s: f64) -> Result<Self, ProgramError> {
        if samples.is_empty() {
            return Err(ProgramError::Empty);
        }
        if !(duration_s.is_finite() && duration_s > 0.0) {
            return Err(ProgramError::InvalidDuration(duration_s));
        }
        let sample_period_s = duration_s / samples.len() as f64;
        Ok(Self {
            id,
            samples,
            duration_s,
            sample_period_s,
        })
    }

    /// Load the program described by a config entry.
    pub fn load(config: &ProgramConfig) -> Result<Self, ProgramError> {
        Self::load_file(config.program, &config.path, config.time_length)
    }

    /// Load a program from a tab-delimited file.
    pub fn load_file(id: u32, path: &Path, duration_s: f64) -> Result<Self, ProgramError> {
        let content = fs::read_to_string(path).map_err(|source| ProgramError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let program = Self::parse(id, &content, duration_s)?;
        info!(
            "Loaded program {} from {:?}: {} samples over {}s (period {:.3}s)",
            id,
            path,
            program.sample_count(),
            program.duration_s,
            program.sample_period_s
        );
        Ok(program)
    }

    /// Parse program text. The first line is a header and is skipped.
    pub fn parse(id: u32, content: &str, duration_s: f64) -> Result<Self, ProgramError> {
        let mut samples = Vec::new();
        for (idx, line) in content.lines().enumerate().skip(1) {
            if line.trim().is_empty() {
                continue;
            }
            let sample = parse_row(line).map_err(|reason| ProgramError::Parse {
                line: idx + 1,
                reason,
            })?;
            samples.push(sample);
        }
        debug!("Parsed {} rows for program {}", samples.len(), id);
        Self::new(id, samples, duration_s)
    }

    #[inline]
    pub fn id(&self) -> u32 {
        self.id
    }

    #[inline]
    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }

    /// Total cycle time in seconds.
    #[inline]
    pub fn duration_s(&self) -> f64 {
        self.duration_s
    }

    /// Time each sample is held, `duration / sample_count`.
    #[inline]
    pub fn sample_period_s(&self) -> f64 {
        self.sample_period_s
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    /// Pose of sample 0.
    pub fn home(&self) -> Pose {
        self.samples[0].pose
    }

    /// Fold an elapsed time into `[0, duration)`.
    pub fn wrap_runtime(&self, elapsed_s: f64) -> f64 {
        let r = elapsed_s.rem_euclid(self.duration_s);
        // rem_euclid may round up to the modulus for tiny negative inputs
        if r >= self.duration_s { 0.0 } else { r }
    }

    /// Sample index for a runtime, wrapped and clamped to the table.
    pub fn index_at(&self, runtime_s: f64) -> usize {
        let r = self.wrap_runtime(runtime_s);
        let idx = (r / self.sample_period_s).floor();
        if idx.is_nan() || idx < 0.0 {
            return 0;
        }
        (idx as usize).min(self.samples.len() - 1)
    }

    /// Sample in effect at a runtime.
    pub fn sample_at(&self, runtime_s: f64) -> &Sample {
        &self.samples[self.index_at(runtime_s)]
    }
}

fn parse_row(line: &str) -> Result<Sample, String> {
    let cols: Vec<&str> = line.split('\t').map(str::trim).collect();
    if cols.len() != ROW_COLUMNS {
        return Err(format!(
            "expected {} tab-separated columns, found {}",
            ROW_COLUMNS,
            cols.len()
        ));
    }

    let coords: [f64; POSE_COORDS] =
        parse_vector(cols[0]).map_err(|e| format!("pose: {e}"))?;
    let joints: [f64; POSE_JOINTS] =
        parse_vector(cols[1]).map_err(|e| format!("joints: {e}"))?;

    Ok(Sample {
        pose: Pose::new(coords, joints),
        laser: parse_effector(cols[2]).map_err(|e| format!("laser: {e}"))?,
        suction_cup: parse_effector(cols[3]).map_err(|e| format!("suction: {e}"))?,
        gripper: parse_effector(cols[4]).map_err(|e| format!("gripper: {e}"))?,
    })
}

/// Parse a bracketed list of exactly `N` finite numbers, e.g. `[1, -2.5, 3, 4]`.
pub fn parse_vector<const N: usize>(text: &str) -> Result<[f64; N], String> {
    let text = unquote(text.trim());
    let inner = text
        .strip_prefix('[')
        .and_then(|t| t.strip_suffix(']'))
        .ok_or_else(|| format!("'{text}' is not a bracketed list"))?;

    let mut out = [0.0; N];
    let mut count = 0;
    for item in inner.split(',') {
        let item = item.trim();
        if count == N {
            return Err(format!("more than {N} values in '{text}'"));
        }
        out[count] = parse_number(item)?;
        count += 1;
    }
    if count != N {
        return Err(format!("expected {N} values, found {count} in '{text}'"));
    }
    Ok(out)
}

fn parse_number(item: &str) -> Result<f64, String> {
    let value: f64 = item
        .parse()
        .map_err(|_| format!("'{item}' is not a number"))?;
    if !value.is_finite() {
        return Err(format!("'{item}' is not finite"));
    }
    Ok(value)
}

fn parse_effector(cell: &str) -> Result<f64, String> {
    let cell = unquote(cell);
    if cell.eq_ignore_ascii_case("true") {
        return Ok(1.0);
    }
    if cell.eq_ignore_ascii_case("false") {
        return Ok(0.0);
    }
    parse_number(cell)
}

fn unquote(text: &str) -> &str {
    text.strip_prefix('"')
        .and_then(|t| t.strip_suffix('"'))
        .unwrap_or(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const HEADER: &str = "pose\tjoints\tlaser\tsuction\tgripper\n";

    fn four_rows() -> String {
        let mut s = HEADER.to_string();
        for i in 0..4 {
            s.push_str(&format!(
                "[{x}, 0, 50, 0]\t[{i}, 30, 40, 0]\t{i}\t0\ttrue\n",
                x = 100 + i * 10
            ));
        }
        s
    }

    #[test]
    fn test_parse_vector() {
        let v: [f64; 4] = parse_vector("[1, -2.5, 3e1, 4]").unwrap();
        assert_eq!(v, [1.0, -2.5, 30.0, 4.0]);
        let v: [f64; 4] = parse_vector("\"[0,0,0,0]\"").unwrap();
        assert_eq!(v, [0.0; 4]);
    }

    #[test]
    fn test_parse_vector_rejects_malformed() {
        assert!(parse_vector::<4>("[1, 2, 3]").is_err());
        assert!(parse_vector::<4>("[1, 2, 3, 4, 5]").is_err());
        assert!(parse_vector::<4>("1, 2, 3, 4").is_err());
        assert!(parse_vector::<4>("[1, 2, x, 4]").is_err());
        assert!(parse_vector::<4>("[1, 2, inf, 4]").is_err());
        assert!(parse_vector::<4>("[__import__('os'), 2, 3, 4]").is_err());
    }

    #[test]
    fn test_parse_program() {
        let program = MotionProgram::parse(3, &four_rows(), 8.0).unwrap();
        assert_eq!(program.id(), 3);
        assert_eq!(program.sample_count(), 4);
        assert_eq!(program.sample_period_s(), 2.0);
        assert_eq!(program.home().coords, [100.0, 0.0, 50.0, 0.0]);
        assert_eq!(program.samples()[2].laser, 2.0);
        assert_eq!(program.samples()[2].gripper, 1.0);
    }

    #[test]
    fn test_parse_skips_blank_lines() {
        let text = format!("{HEADER}\n[0,0,0,0]\t[0,0,0,0]\t0\t0\t0\n\n");
        let program = MotionProgram::parse(1, &text, 1.0).unwrap();
        assert_eq!(program.sample_count(), 1);
    }

    #[test]
    fn test_parse_reports_line_number() {
        let text = format!("{HEADER}[0,0,0,0]\t[0,0,0,0]\t0\t0\t0\n[0,0,0]\t[0,0,0,0]\t0\t0\t0\n");
        match MotionProgram::parse(1, &text, 1.0) {
            Err(ProgramError::Parse { line, reason }) => {
                assert_eq!(line, 3);
                assert!(reason.starts_with("pose"));
            }
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_wrong_column_count() {
        let text = format!("{HEADER}[0,0,0,0]\t[0,0,0,0]\t0\t0\n");
        assert!(matches!(
            MotionProgram::parse(1, &text, 1.0),
            Err(ProgramError::Parse { line: 2, .. })
        ));
    }

    #[test]
    fn test_empty_program_rejected() {
        assert!(matches!(
            MotionProgram::parse(1, HEADER, 1.0),
            Err(ProgramError::Empty)
        ));
    }

    #[test]
    fn test_invalid_duration_rejected() {
        assert!(matches!(
            MotionProgram::parse(1, &four_rows(), 0.0),
            Err(ProgramError::InvalidDuration(_))
        ));
    }

    #[test]
    fn test_index_law() {
        let program = MotionProgram::parse(1, &four_rows(), 8.0).unwrap();
        assert_eq!(program.index_at(0.0), 0);
        assert_eq!(program.index_at(1.99), 0);
        assert_eq!(program.index_at(2.0), 1);
        assert_eq!(program.index_at(7.99), 3);
        assert_eq!(program.index_at(8.0), 0);
        assert_eq!(program.index_at(8.0 * 5.0 + 4.5), 2);
        assert_eq!(program.index_at(-1.0), 3);
    }

    #[test]
    fn test_wrap_law() {
        let program = MotionProgram::parse(1, &four_rows(), 8.0).unwrap();
        assert_eq!(program.sample_at(8.0), program.sample_at(0.0));
        assert_eq!(program.wrap_runtime(8.0), 0.0);
    }

    #[test]
    fn test_load_file_missing() {
        let result = MotionProgram::load_file(1, Path::new("/nonexistent/program.tsv"), 1.0);
        assert!(matches!(result, Err(ProgramError::Io { .. })));
    }

    #[test]
    fn test_load_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", four_rows()).unwrap();
        file.flush().unwrap();

        let program = MotionProgram::load(&ProgramConfig {
            program: 9,
            path: file.path().to_path_buf(),
            time_length: 4.0,
        })
        .unwrap();
        assert_eq!(program.id(), 9);
        assert_eq!(program.sample_count(), 4);
    }
}
