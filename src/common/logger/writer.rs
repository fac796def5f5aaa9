use std::{
    fs::{self, OpenOptions},
    io::{self, Write},
    sync::Arc,
};

use parking_lot::Mutex;

/// Removes ANSI escape sequences so the log file stays plain text.
pub fn strip_ansi_escapes(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut in_escape = false;
    for c in s.chars() {
        if c == '\x1b' {
            in_escape = true;
        } else if in_escape {
            if c.is_ascii_alphabetic() {
                in_escape = false;
            }
        } else {
            result.push(c);
        }
    }
    result
}

/// Appends to a log file and keeps only the newest `max_lines` lines.
///
/// Trimming happens once the file has grown 10% (at least 50 lines) past the
/// limit, so the file is not rewritten on every event.
#[derive(Clone)]
pub(crate) struct CircularFileWriter {
    path: String,
    max_lines: u32,
    lines: Arc<Mutex<Option<u32>>>,
}

impl CircularFileWriter {
    pub fn new(path: String, max_lines: u32) -> Self {
        Self {
            path,
            max_lines,
            lines: Arc::new(Mutex::new(None)),
        }
    }

    fn slack(&self) -> u32 {
        (self.max_lines / 10).max(50)
    }

    fn count_lines(&self) -> u32 {
        fs::read_to_string(&self.path)
            .map(|s| s.lines().count() as u32)
            .unwrap_or(0)
    }

    fn trim(&self) -> io::Result<u32> {
        let content = fs::read_to_string(&self.path)?;
        let lines: Vec<&str> = content.lines().collect();
        let keep = self.max_lines as usize;
        if lines.len() <= keep {
            return Ok(lines.len() as u32);
        }
        let mut out = lines[lines.len() - keep..].join("\n");
        out.push('\n');
        fs::write(&self.path, out)?;
        Ok(self.max_lines)
    }
}

impl io::Write for CircularFileWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(buf)?;

        let mut lines = self.lines.lock();
        let added = buf.iter().filter(|&&b| b == b'\n').count() as u32;
        let mut total = match *lines {
            Some(n) => n + added,
            None => self.count_lines(),
        };

        if total > self.max_lines + self.slack() {
            match self.trim() {
                Ok(n) => total = n,
                Err(e) => eprintln!("Failed to trim log file: {}", e),
            }
        }
        *lines = Some(total);

        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for CircularFileWriter {
    type Writer = Self;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_color_codes() {
        assert_eq!(strip_ansi_escapes("\x1b[32mINFO\x1b[0m ok"), "INFO ok");
    }

    #[test]
    fn trims_to_max_lines() {
        let path = std::env::temp_dir().join(format!(
            "lockstep-log-{}.log",
            crate::common::SessionId::generate()
        ));
        let path_str = path.to_string_lossy().to_string();
        let mut writer = CircularFileWriter::new(path_str.clone(), 10);

        for i in 0..200 {
            writer.write_all(format!("line {i}\n").as_bytes()).unwrap();
        }

        let content = fs::read_to_string(&path).unwrap();
        let count = content.lines().count();
        assert!(count <= 10 + 50, "log kept {count} lines");
        assert!(content.ends_with("line 199\n"));
        let _ = fs::remove_file(&path);
    }
}
