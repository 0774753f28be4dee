//! Parser for `bpftrace` linear histogram output: `[a, b)    N |bars|`.

use super::bcc::HistogramBucket;
use super::ParseError;

/// bpftrace `lhist()` rows look like:
/// `[0, 10)               3 |@@@                                                 |`
/// `[10, 20)              9 |@@@@@@@@@                                           |`
pub fn parse_linear_histogram(input: &str) -> Result<Vec<HistogramBucket>, ParseError> {
    let mut out = Vec::new();
    for line in input.lines() {
        let line = line.trim();
        let Some(rest) = line.strip_prefix('[') else { continue };
        let Some((range, rest)) = rest.split_once(')') else { continue };
        let mut bounds = range.split(',').map(|b| b.trim());
        let (Some(start_s), Some(end_s)) = (bounds.next(), bounds.next()) else { continue };
        let (Ok(start), Ok(end)) = (start_s.parse::<f64>(), end_s.parse::<f64>()) else { continue };
        let count = rest.split('|').next().unwrap_or("0").trim().parse().unwrap_or(0);
        out.push(HistogramBucket { range_start: start, range_end: end, count });
    }
    if out.is_empty() {
        return Err(ParseError::UnexpectedFormat("no linear histogram rows parsed".into()));
    }
    Ok(out)
}

/// Bucket width is constant for a linear histogram: `range_end - range_start`.
pub fn bucket_width(buckets: &[HistogramBucket]) -> Option<f64> {
    buckets.first().map(|b| b.range_end - b.range_start)
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE: &str =
        "[0, 10000)              3 |@@@                                                 |\n[10000, 20000)          9 |@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@            |\n";

    #[test]
    fn parses_linear_buckets_with_constant_width() {
        let buckets = parse_linear_histogram(FIXTURE).unwrap();
        assert_eq!(buckets.len(), 2);
        assert_eq!(bucket_width(&buckets), Some(10000.0));
    }
}
