//! Writing a [`Pmf`] as a two-column CSV table.

use crate::errors::*;
use crate::pmf::Pmf;
use std::fmt;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

const SIGNIFICANT_DIGITS: usize = 6;

/// Displays a float the way C's `%g` does with six significant digits
///
/// Fixed notation is used for decimal exponents in `-4..6`, scientific notation with a signed
/// two-digit exponent otherwise; trailing zeros are dropped in both.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct General(pub f64);

impl fmt::Display for General {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let x = self.0;
        if x.is_nan() {
            return f.write_str("nan");
        }
        if x.is_infinite() {
            return f.write_str(if x > 0.0 { "inf" } else { "-inf" });
        }
        if x == 0.0 {
            return f.write_str(if x.is_sign_negative() { "-0" } else { "0" });
        }

        let sci = format!("{:.*e}", SIGNIFICANT_DIGITS - 1, x);
        let (mantissa, exponent) = sci.split_once('e').ok_or(fmt::Error)?;
        let exponent: i32 = exponent.parse().map_err(|_| fmt::Error)?;

        if exponent < -4 || exponent >= SIGNIFICANT_DIGITS as i32 {
            let sign = if exponent < 0 { '-' } else { '+' };
            write!(
                f,
                "{}e{}{:02}",
                trim_zeros(mantissa),
                sign,
                exponent.abs()
            )
        } else {
            let decimals = (SIGNIFICANT_DIGITS as i32 - 1 - exponent) as usize;
            f.write_str(trim_zeros(&format!("{:.*}", decimals, x)))
        }
    }
}

fn trim_zeros(s: &str) -> &str {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.')
    } else {
        s
    }
}

/// Write the PMF table: two `#` header lines, then one `r,G` line per grid point
pub fn write_pmf(writer: &mut impl Write, jobname: &str, pmf: &Pmf) -> io::Result<()> {
    writeln!(writer, "# {} {}-trajectory pmf", jobname, pmf.num_traj)?;
    writeln!(writer, "# r (Å), G (kcal/mol)")?;
    for (&r, &g) in pmf.r.iter().zip(pmf.g.iter()) {
        writeln!(writer, "{},{}", General(r), General(g))?;
    }
    writer.flush()
}

/// Write the PMF table to `path`, replacing any existing file
pub fn write_pmf_to_path(path: impl AsRef<Path>, jobname: &str, pmf: &Pmf) -> Result<()> {
    let path = path.as_ref();
    let output_error = |source| SmdError::Output {
        path: path.to_path_buf(),
        source,
    };
    let file = File::create(path).map_err(output_error)?;
    write_pmf(&mut BufWriter::new(file), jobname, pmf).map_err(output_error)
}
