//! Compressed `.npz` snapshot archives
//!
//! An archive is a deflate-compressed zip holding NumPy `.npy` members:
//! - `snapshots.npy`: `<f8`, shape `(num_snapshots, N, 3)`
//! - `steps.npy`:     `<u8`, shape `(num_snapshots,)`
//! - `kinds.npy`:     `|u1`, shape `(N,)`, see [`ParticleKind::code`]
//!
//! `numpy.load(path)["snapshots"]` reads the first member directly.

use std::fs::{self, File};
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use tracing::info;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::error::{SimError, SimResult};
use crate::output::sink::{check_sequence, SnapshotSink};
use crate::simulation::states::{NVec3, ParticleKind, Snapshot};

const NPY_MAGIC: &[u8] = b"\x93NUMPY";

/// Snapshot sink writing an `.npz` archive to `path`
pub struct NpzArchive {
    path: PathBuf,
    kinds: Vec<ParticleKind>,
}

impl NpzArchive {
    pub fn new(path: impl Into<PathBuf>, kinds: Vec<ParticleKind>) -> Self {
        Self { path: path.into(), kinds }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SnapshotSink for NpzArchive {
    fn persist(&mut self, particle_count: usize, snapshots: &[Snapshot]) -> SimResult<()> {
        save_snapshots(&self.path, particle_count, snapshots, &self.kinds)
    }
}

/// Contents of a loaded archive
#[derive(Debug, Clone)]
pub struct LoadedArchive {
    pub particle_count: usize,
    pub snapshots: Vec<Snapshot>,
    pub kinds: Vec<ParticleKind>,
}

/// Write `snapshots` to `path`. `kinds` is either empty or one tag per particle.
pub fn save_snapshots(path: &Path, particle_count: usize, snapshots: &[Snapshot], kinds: &[ParticleKind]) -> SimResult<()> {
    check_sequence(particle_count, snapshots)?;
    if !kinds.is_empty() && kinds.len() != particle_count {
        return Err(SimError::Archive(format!(
            "{} kind tags for {} particles",
            kinds.len(),
            particle_count
        )));
    }

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let payload = snapshots.len() * particle_count * 3 * 8;
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .large_file(payload >= u32::MAX as usize);

    let mut zip = ZipWriter::new(BufWriter::new(File::create(path)?));

    zip.start_file("snapshots.npy", options)?;
    zip.write_all(&npy_header("<f8", &[snapshots.len(), particle_count, 3]))?;
    let mut row = Vec::with_capacity(particle_count * 3 * 8);
    for snapshot in snapshots {
        row.clear();
        for p in snapshot.positions() {
            for c in p.iter() {
                row.extend_from_slice(&c.to_le_bytes());
            }
        }
        zip.write_all(&row)?;
    }

    zip.start_file("steps.npy", options)?;
    zip.write_all(&npy_header("<u8", &[snapshots.len()]))?;
    for snapshot in snapshots {
        zip.write_all(&(snapshot.step() as u64).to_le_bytes())?;
    }

    let codes: Vec<u8> = if kinds.is_empty() {
        vec![ParticleKind::Body.code(); particle_count]
    } else {
        kinds.iter().map(|k| k.code()).collect()
    };
    zip.start_file("kinds.npy", options)?;
    zip.write_all(&npy_header("|u1", &[particle_count]))?;
    zip.write_all(&codes)?;

    let mut inner = zip.finish()?;
    inner.flush()?;

    info!(
        "wrote {} snapshots of {} particles to {}",
        snapshots.len(),
        particle_count,
        path.display()
    );
    Ok(())
}

/// Read an archive written by [`save_snapshots`]. `steps.npy` and `kinds.npy`
/// are optional so archives holding only `snapshots` also load.
pub fn load_snapshots(path: &Path) -> SimResult<LoadedArchive> {
    let mut archive = ZipArchive::new(File::open(path)?)?;

    let (shape, data) = read_member(&mut archive, "snapshots.npy", "<f8")?
        .ok_or_else(|| SimError::Archive("archive has no snapshots member".into()))?;
    let (num_snapshots, particle_count) = match shape.as_slice() {
        [s, n, 3] => (*s, *n),
        other => return Err(SimError::Archive(format!("snapshots must have shape (S, N, 3), got {other:?}"))),
    };
    if data.len() != num_snapshots * particle_count * 3 * 8 {
        return Err(SimError::Archive("snapshot payload does not match its shape".into()));
    }

    if num_snapshots > 0 && particle_count == 0 {
        return Err(SimError::Archive(format!("{num_snapshots} snapshots of zero particles")));
    }

    let steps: Vec<usize> = match read_member(&mut archive, "steps.npy", "<u8")? {
        Some((shape, bytes)) => {
            if shape != [num_snapshots] || bytes.len() != num_snapshots * 8 {
                return Err(SimError::Archive(format!(
                    "steps must have shape ({num_snapshots},) with {} payload bytes, got {shape:?} with {}",
                    num_snapshots * 8,
                    bytes.len()
                )));
            }
            bytes
                .chunks_exact(8)
                .map(|c| u64::from_le_bytes(c.try_into().unwrap_or([0; 8])) as usize)
                .collect()
        }
        None => (0..num_snapshots).collect(),
    };

    let kinds: Vec<ParticleKind> = match read_member(&mut archive, "kinds.npy", "|u1")? {
        Some((shape, bytes)) => {
            if shape != [particle_count] || bytes.len() != particle_count {
                return Err(SimError::Archive(format!(
                    "kinds must hold one tag per particle ({particle_count}), got {shape:?} with {} bytes",
                    bytes.len()
                )));
            }
            bytes
                .iter()
                .map(|b| ParticleKind::from_code(*b).ok_or_else(|| SimError::Archive(format!("unknown kind tag {b}"))))
                .collect::<SimResult<_>>()?
        }
        None => vec![ParticleKind::Body; particle_count],
    };

    let values: Vec<f64> = data
        .chunks_exact(8)
        .map(|c| f64::from_le_bytes(c.try_into().unwrap_or([0; 8])))
        .collect();
    let per_snapshot = particle_count * 3;
    let snapshots: Vec<Snapshot> = if per_snapshot == 0 {
        Vec::new()
    } else {
        values
            .chunks_exact(per_snapshot)
            .zip(steps)
            .map(|(chunk, step)| {
                let positions = chunk.chunks_exact(3).map(|p| NVec3::new(p[0], p[1], p[2])).collect();
                Snapshot::new(step, positions)
            })
            .collect()
    };
    check_sequence(particle_count, &snapshots)?;

    Ok(LoadedArchive {
        particle_count,
        snapshots,
        kinds,
    })
}

/// NumPy format 1.0 header for a C-ordered array, padded to 64 bytes
pub fn npy_header(descr: &str, shape: &[usize]) -> Vec<u8> {
    let dims = match shape {
        [single] => format!("({single},)"),
        _ => format!("({})", shape.iter().map(|d| d.to_string()).collect::<Vec<_>>().join(", ")),
    };
    let mut dict = format!("{{'descr': '{descr}', 'fortran_order': False, 'shape': {dims}, }}");

    // magic (6) + version (2) + length (2) + dict + '\n' must be a multiple of 64
    let unpadded = NPY_MAGIC.len() + 4 + dict.len() + 1;
    let padding = (64 - unpadded % 64) % 64;
    dict.push_str(&" ".repeat(padding));
    dict.push('\n');

    let mut out = Vec::with_capacity(NPY_MAGIC.len() + 4 + dict.len());
    out.extend_from_slice(NPY_MAGIC);
    out.extend_from_slice(&[1, 0]);
    out.extend_from_slice(&(dict.len() as u16).to_le_bytes());
    out.extend_from_slice(dict.as_bytes());
    out
}

/// Parse a `.npy` buffer into its shape and raw little-endian payload
pub fn parse_npy(bytes: &[u8], expected_descr: &str) -> SimResult<(Vec<usize>, Vec<u8>)> {
    if bytes.len() < 10 || &bytes[..6] != NPY_MAGIC {
        return Err(SimError::Archive("not a .npy member".into()));
    }
    let (header_len, start) = match bytes[6] {
        1 => (u16::from_le_bytes([bytes[8], bytes[9]]) as usize, 10),
        2 | 3 if bytes.len() >= 12 => (u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]) as usize, 12),
        v => return Err(SimError::Archive(format!("unsupported .npy version {v}"))),
    };
    let end = start + header_len;
    if bytes.len() < end {
        return Err(SimError::Archive("truncated .npy header".into()));
    }
    let header = std::str::from_utf8(&bytes[start..end]).map_err(|e| SimError::Archive(e.to_string()))?;

    let descr = header_value(header, "'descr':")
        .map(|v| v.trim().trim_matches(|c| c == '\'' || c == ',').to_string())
        .ok_or_else(|| SimError::Archive("header has no descr".into()))?;
    if descr != expected_descr {
        return Err(SimError::Archive(format!("expected dtype {expected_descr}, found {descr}")));
    }
    if header.contains("'fortran_order': True") {
        return Err(SimError::Archive("fortran-ordered arrays are not supported".into()));
    }

    let open = header.find("'shape':").and_then(|i| header[i..].find('(').map(|j| i + j + 1));
    let close = open.and_then(|o| header[o..].find(')').map(|j| o + j));
    let shape = match (open, close) {
        (Some(o), Some(c)) => header[o..c]
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| s.parse::<usize>().map_err(|e| SimError::Archive(format!("bad shape entry {s}: {e}"))))
            .collect::<SimResult<Vec<_>>>()?,
        _ => return Err(SimError::Archive("header has no shape".into())),
    };

    Ok((shape, bytes[end..].to_vec()))
}

fn header_value<'a>(header: &'a str, key: &str) -> Option<&'a str> {
    let at = header.find(key)? + key.len();
    let rest = &header[at..];
    let end = rest.find(',').map(|i| i + 1).unwrap_or(rest.len());
    Some(&rest[..end])
}

fn read_member(archive: &mut ZipArchive<File>, name: &str, descr: &str) -> SimResult<Option<(Vec<usize>, Vec<u8>)>> {
    let mut file = match archive.by_name(name) {
        Ok(f) => f,
        Err(zip::result::ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes)?;
    parse_npy(&bytes, descr).map(Some)
}
