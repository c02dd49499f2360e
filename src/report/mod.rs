//! BLAST match records and the tabular/pairwise writers.
//!
//! Tabular output follows the `-outfmt 6` column set (qseqid sseqid pident
//! length mismatch gapopen qstart qend sstart send evalue bitscore), with
//! optional taxid and lca columns in classification mode. E-value and
//! bit-score formatting follow the NCBI tier rules so diffs against BLAST
//! output stay quiet.

use std::io::{self, Write};
use std::path::Path;

/// A fully scored and annotated alignment, ready to write.
#[derive(Debug, Clone)]
pub struct BlastMatch {
    pub query_id: String,
    pub subject_id: String,
    pub identity_pct: f64,
    pub length: usize,
    pub mismatch: usize,
    pub gapopen: usize,
    pub gaps: usize,
    pub positives: usize,
    /// 1-based coordinates on the original sequences; start > end encodes
    /// the minus strand.
    pub q_start: usize,
    pub q_end: usize,
    pub s_start: usize,
    pub s_end: usize,
    pub q_frame: i8,
    pub s_frame: i8,
    /// Signed original-sequence positions consumed per alignment column
    /// (±3 for translated rows, ±1 otherwise).
    pub q_unit: i64,
    pub s_unit: i64,
    pub raw_score: i32,
    pub bit_score: f64,
    pub e_value: f64,
    pub tax_ids: Vec<u32>,
    pub lca: Option<u32>,
    /// Gapped rows in ASCII with '-' for gaps.
    pub q_row: String,
    pub s_row: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Tabular,
    Pairwise,
}

/// Pick the output format from the file extension; `.m0` selects the
/// pairwise view, everything else (including stdout) is tabular.
pub fn infer_format(path: Option<&Path>) -> OutputFormat {
    match path.and_then(|p| p.extension()).and_then(|e| e.to_str()) {
        Some("m0") => OutputFormat::Pairwise,
        _ => OutputFormat::Tabular,
    }
}

/// E-value formatting tiers as BLAST tabular output prints them.
pub fn format_evalue(e_value: f64) -> String {
    if e_value == 0.0 || e_value < 1.0e-180 {
        "0.0".to_string()
    } else if e_value < 0.0009 {
        let mut s = format!("{:.2e}", e_value);
        // pad one-digit exponents: 1.00e-5 -> 1.00e-05
        if let Some(pos) = s.find('e') {
            let (mantissa, exp) = s.split_at(pos);
            let exp = &exp[1..];
            let (sign, digits) = match exp.as_bytes()[0] {
                b'-' => ("-", &exp[1..]),
                b'+' => ("+", &exp[1..]),
                _ => ("+", exp),
            };
            if digits.len() < 2 {
                s = format!("{mantissa}e{sign}0{digits}");
            }
        }
        s
    } else if e_value < 0.1 {
        format!("{:.3}", e_value)
    } else if e_value < 1.0 {
        format!("{:.2}", e_value)
    } else if e_value < 10.0 {
        format!("{:.1}", e_value)
    } else {
        format!("{:.0}", e_value)
    }
}

pub fn format_bitscore(bit_score: f64) -> String {
    if bit_score > 99999.0 {
        format!("{:.3e}", bit_score)
    } else if bit_score > 99.9 {
        format!("{:.0}", bit_score)
    } else {
        format!("{:.1}", bit_score)
    }
}

/// Write one tabular line; `with_tax` appends the taxid list and LCA.
pub fn write_tabular<W: Write>(w: &mut W, rec: &BlastMatch, with_tax: bool) -> io::Result<()> {
    write!(
        w,
        "{}\t{}\t{:.3}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
        rec.query_id,
        rec.subject_id,
        rec.identity_pct,
        rec.length,
        rec.mismatch,
        rec.gapopen,
        rec.q_start,
        rec.q_end,
        rec.s_start,
        rec.s_end,
        format_evalue(rec.e_value),
        format_bitscore(rec.bit_score),
    )?;
    if with_tax {
        write!(w, "\t")?;
        if rec.tax_ids.is_empty() {
            write!(w, "0")?;
        } else {
            for (i, t) in rec.tax_ids.iter().enumerate() {
                if i > 0 {
                    write!(w, ";")?;
                }
                write!(w, "{t}")?;
            }
        }
        match rec.lca {
            Some(l) => write!(w, "\t{l}")?,
            None => write!(w, "\t0")?,
        }
    }
    writeln!(w)
}

const PAIRWISE_WIDTH: usize = 60;

/// Write one match in the classic pairwise view.
pub fn write_pairwise<W: Write>(w: &mut W, rec: &BlastMatch) -> io::Result<()> {
    writeln!(w, "> {} vs {}", rec.query_id, rec.subject_id)?;
    writeln!(
        w,
        " Score = {} bits ({}), Expect = {}",
        format_bitscore(rec.bit_score),
        rec.raw_score,
        format_evalue(rec.e_value),
    )?;
    writeln!(
        w,
        " Identities = {}/{} ({:.0}%), Positives = {}/{} ({:.0}%), Gaps = {}/{} ({:.0}%)",
        (rec.identity_pct / 100.0 * rec.length as f64).round() as usize,
        rec.length,
        rec.identity_pct,
        rec.positives,
        rec.length,
        100.0 * rec.positives as f64 / rec.length.max(1) as f64,
        rec.gaps,
        rec.length,
        100.0 * rec.gaps as f64 / rec.length.max(1) as f64,
    )?;
    if rec.q_frame != 0 || rec.s_frame != 0 {
        writeln!(w, " Frame = {:+}/{:+}", rec.q_frame, rec.s_frame)?;
    }
    writeln!(w)?;

    let q: Vec<char> = rec.q_row.chars().collect();
    let s: Vec<char> = rec.s_row.chars().collect();

    let mut q_pos = rec.q_start as i64;
    let mut s_pos = rec.s_start as i64;
    let mut col = 0usize;
    while col < q.len() {
        let stop = (col + PAIRWISE_WIDTH).min(q.len());
        let q_line: String = q[col..stop].iter().collect();
        let s_line: String = s[col..stop].iter().collect();
        let mid: String = q[col..stop]
            .iter()
            .zip(&s[col..stop])
            .map(|(&a, &b)| if a == b && a != '-' { '|' } else { ' ' })
            .collect();

        let q_consumed = q[col..stop].iter().filter(|&&c| c != '-').count() as i64;
        let s_consumed = s[col..stop].iter().filter(|&&c| c != '-').count() as i64;
        // last original-sequence position covered by this line
        let q_line_end = q_pos + q_consumed * rec.q_unit - rec.q_unit.signum();
        let s_line_end = s_pos + s_consumed * rec.s_unit - rec.s_unit.signum();

        writeln!(w, "Query  {:<6} {}  {}", q_pos, q_line, q_line_end)?;
        writeln!(w, "       {:<6} {}", "", mid)?;
        writeln!(w, "Sbjct  {:<6} {}  {}", s_pos, s_line, s_line_end)?;
        writeln!(w)?;

        q_pos = q_line_end + rec.q_unit.signum();
        s_pos = s_line_end + rec.s_unit.signum();
        col = stop;
    }
    Ok(())
}
