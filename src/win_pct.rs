use crate::Error;
use std::fs::read_to_string;

/// Win-probability table over `(score_diff, tiles_unseen)`.
///
/// CSV rows are `score_diff, p(unseen=1), p(unseen=2), ...` sorted by
/// descending score difference. Lookups clamp both axes to the table
/// edges.
#[derive(Debug, Clone)]
pub struct WinPct {
    /// Highest score difference in the table; rows descend from here.
    max_diff: i32,
    rows: Vec<Vec<f64>>,
}

impl WinPct {
    /// Parse from CSV.
    /// ## Errors
    /// If a row is malformed or the probabilities are out of `[0, 1]`.
    pub fn from_csv(csv: &str) -> Result<WinPct, Error> {
        let mut max_diff = None;
        let mut rows = Vec::new();
        for line in csv.lines().map(str::trim).filter(|l| !l.is_empty()) {
            let mut fields = line.split(',').map(str::trim);
            let diff: i32 = fields
                .next()
                .and_then(|f| f.parse().ok())
                .ok_or_else(|| Error::WinPctParseError(format!("bad row: {}", line)))?;
            let probs: Option<Vec<f64>> = fields.map(|f| f.parse().ok()).collect();
            let probs = probs
                .filter(|p| !p.is_empty() && p.iter().all(|&x| (0.0..=1.0).contains(&x)))
                .ok_or_else(|| Error::WinPctParseError(format!("bad row: {}", line)))?;
            if max_diff.is_none() {
                max_diff = Some(diff);
            }
            rows.push(probs);
        }
        match max_diff {
            Some(max_diff) if !rows.is_empty() => Ok(WinPct { max_diff, rows }),
            _ => Err(Error::WinPctParseError(String::from("empty table"))),
        }
    }

    /// Read a table file.
    /// ## Errors
    /// If the file cannot be read or parsed.
    pub fn from_file(path: &str) -> Result<WinPct, Error> {
        let csv = read_to_string(path).map_err(|source| Error::ReadError {
            path: String::from(path),
            source,
        })?;
        let wp = WinPct::from_csv(&csv)?;
        log::info!("loaded win percentages from {} ({} rows)", path, wp.rows.len());
        Ok(wp)
    }

    /// Probability of winning from a score difference with this many
    /// tiles unseen. Out-of-table inputs clamp to the edges.
    pub fn win_probability(&self, score_diff: i32, tiles_unseen: usize) -> f64 {
        let row = (self.max_diff - score_diff)
            .max(0)
            .min(self.rows.len() as i32 - 1) as usize;
        let cols = self.rows[row].len();
        let col = tiles_unseen.max(1).min(cols) - 1;
        self.rows[row][col]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TABLE: &str = "\
        2,1.0,0.9\n\
        1,0.9,0.8\n\
        0,0.5,0.5\n\
        -1,0.1,0.2\n\
        -2,0.0,0.1\n";

    #[test]
    fn test_lookup() {
        let wp = WinPct::from_csv(TABLE).unwrap();
        assert_eq!(wp.win_probability(2, 1), 1.0);
        assert_eq!(wp.win_probability(0, 2), 0.5);
        assert_eq!(wp.win_probability(-1, 2), 0.2);
    }

    #[test]
    fn test_clamping() {
        let wp = WinPct::from_csv(TABLE).unwrap();
        // Above and below the table range.
        assert_eq!(wp.win_probability(100, 1), 1.0);
        assert_eq!(wp.win_probability(-100, 1), 0.0);
        // More unseen tiles than columns, and zero unseen.
        assert_eq!(wp.win_probability(0, 99), 0.5);
        assert_eq!(wp.win_probability(2, 0), 1.0);
    }

    #[test]
    fn test_bad_rows() {
        assert!(matches!(
            WinPct::from_csv(""),
            Err(Error::WinPctParseError(_))
        ));
        assert!(matches!(
            WinPct::from_csv("x,0.5\n"),
            Err(Error::WinPctParseError(_))
        ));
        assert!(matches!(
            WinPct::from_csv("1,1.5\n"),
            Err(Error::WinPctParseError(_))
        ));
        assert!(matches!(
            WinPct::from_csv("1\n"),
            Err(Error::WinPctParseError(_))
        ));
    }
}
