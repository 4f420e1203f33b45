//! Text dumps of hash table buckets and hashed pairs, for debugging runs.

use std::ffi::OsString;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::algorithm::histogram::Histogram1D;
use crate::algorithm::pair_matching::Candidate;
use crate::data::point_cloud::PointCloud;
use crate::error::Result;

/// `<base>_<tag>_<serial>`
pub fn dump_path(base: &Path, tag: &str, serial: usize) -> PathBuf {
    let mut name = OsString::from(base.as_os_str());
    name.push(format!("_{}_{}", tag, serial));
    PathBuf::from(name)
}

/// Bucket heights of one hash table, one block per filtering stage.
pub struct BucketDump {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl BucketDump {
    pub fn create(base: &Path, tag: &str, serial: usize, title: &str) -> Result<Self> {
        let path = dump_path(base, tag, serial);
        let mut writer = BufWriter::new(File::create(&path)?);
        writeln!(
            writer,
            "# {} hash table buckets dump ( scale, height ) : {}",
            title,
            path.display()
        )?;
        Ok(BucketDump { path, writer })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write every bucket as `key<TAB>height<TAB>stage` below a `# header` line.
    pub fn write_stage(&mut self, header: &str, hist: &Histogram1D, stage: u32) -> Result<()> {
        writeln!(self.writer, "# {}", header)?;
        for (index, height) in hist.data().iter().enumerate() {
            writeln!(
                self.writer,
                "{}\t{}\t{}",
                hist.index_to_key(index as f64),
                height,
                stage
            )?;
        }
        writeln!(self.writer)?;
        Ok(())
    }

    pub fn write_comment(&mut self, line: &str) -> Result<()> {
        writeln!(self.writer, "# {}", line)?;
        Ok(())
    }

    pub fn finish(mut self) -> Result<()> {
        writeln!(self.writer, "# EOF")?;
        self.writer.flush()?;
        Ok(())
    }
}

/// Every hashed correspondence of one hashing round.
pub struct PairDump {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl PairDump {
    pub fn create(base: &Path, phase: &str, serial: usize) -> Result<Self> {
        let path = dump_path(base, phase, serial);
        let mut writer = BufWriter::new(File::create(&path)?);
        writeln!(writer, "# i j k l")?;
        Ok(PairDump { path, writer })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// One line per candidate: index, RT and m/z of i, j, k, l followed by the weight.
    pub fn write(
        &mut self,
        candidate: &Candidate,
        model: &PointCloud,
        scene: &PointCloud,
    ) -> Result<()> {
        let (pi, pj) = (&model.points[candidate.i], &model.points[candidate.j]);
        let (pk, pl) = (&scene.points[candidate.k], &scene.points[candidate.l]);
        writeln!(
            self.writer,
            "{} {} {} {} {} {} {} {} {} {} {} {} {}",
            candidate.i,
            pi.rt,
            pi.mz,
            candidate.j,
            pj.rt,
            pj.mz,
            candidate.k,
            pk.rt,
            pk.mz,
            candidate.l,
            pl.rt,
            pl.mz,
            candidate.weight
        )?;
        Ok(())
    }

    pub fn finish(mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}
