use std::fmt;
use termion::style::{Underline, Reset};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// Print rows as a table with an underlined header, truncating the last
/// column to fit the terminal when possible.
pub fn print_table<R: AsRef<[String]>>(header: &[&str], rows: &[R]) {
    let mut widths = header.iter()
        .map(|title| UnicodeWidthStr::width(*title))
        .collect::<Vec<_>>();

    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row.as_ref()) {
            *width = (*width).max(UnicodeWidthStr::width(cell.as_str()));
        }
    }

    let total = widths.iter().sum::<usize>() + widths.len().saturating_sub(1);
    let (terminal, _) = termion::terminal_size().unwrap_or((80, 20));
    let terminal = usize::from(terminal);

    if total > terminal {
        if let Some(last) = widths.last_mut() {
            let overflow = total - terminal;
            // Too narrow to fit even after truncation; let the terminal wrap.
            if overflow < *last {
                *last -= overflow;
            }
        }
    }

    let header = header.iter()
        .zip(&widths)
        .map(|(title, width)| format!("{}{}{}", Underline, Cell(title, *width), Reset))
        .collect::<Vec<_>>();
    println!("{}", header.join(" "));

    for row in rows {
        let line = row.as_ref().iter()
            .zip(&widths)
            .map(|(cell, width)| Cell(cell, *width).to_string())
            .collect::<Vec<_>>();
        println!("{}", line.join(" ").trim_end());
    }
}

/// A table cell, padded or truncated to a display width.
struct Cell<'a>(&'a str, usize);

impl<'a> fmt::Display for Cell<'a> {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        let mut width = 0;
        let mut end = 0;

        for (inx, chr) in self.0.char_indices() {
            let w = UnicodeWidthChar::width(chr).unwrap_or(0);
            if width + w > self.1 {
                break;
            }
            width += w;
            end = inx + chr.len_utf8();
        }

        write!(fmt, "{}{:pad$}", &self.0[..end], "", pad = self.1 - width)
    }
}
