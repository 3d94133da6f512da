use std::io::{self, Seek, SeekFrom, Write};

/// Receives save progress as a percentage.
///
/// Values are estimates derived from the saver's size estimate. A final
/// report of exactly 100 is not guaranteed.
pub trait SavingProgress {
    fn set_progress(&mut self, percent: u8);
}

impl<F: FnMut(u8)> SavingProgress for F {
    fn set_progress(&mut self, percent: u8) {
        self(percent)
    }
}

pub(crate) fn percent_of(written: u64, estimate: u64) -> u8 {
    if estimate == 0 {
        return 50;
    }
    (written.saturating_mul(100) / estimate).min(100) as u8
}

/// Counts bytes on their way to the inner writer and reports progress after
/// every write.
///
/// Seeking back (as the zip writer does to patch headers) does not count as
/// progress; only the furthest position reached does.
pub struct ProgressWriter<'p, W> {
    inner: W,
    estimate: u64,
    position: u64,
    high_water: u64,
    progress: &'p mut dyn SavingProgress,
}

impl<'p, W> ProgressWriter<'p, W> {
    pub fn new(inner: W, estimate: u64, progress: &'p mut dyn SavingProgress) -> Self {
        ProgressWriter {
            inner,
            estimate,
            position: 0,
            high_water: 0,
            progress,
        }
    }

    pub fn bytes_written(&self) -> u64 {
        self.high_water
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> Write for ProgressWriter<'_, W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.position += n as u64;
        self.high_water = self.high_water.max(self.position);
        self.progress
            .set_progress(percent_of(self.high_water, self.estimate));
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

impl<W: Seek> Seek for ProgressWriter<'_, W> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.position = self.inner.seek(pos)?;
        Ok(self.position)
    }
}
