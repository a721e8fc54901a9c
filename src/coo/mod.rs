mod bin_codec;
mod text_parser;
mod text_writer;

use crossbeam::thread;
use std::path::Path;

use crate::error::{Error, Result};
use crate::mapped_file::{FileFormat, MappedFile};
use crate::scalar::{Index, Weight};
use crate::shared_slice::SharedSliceMut;
use crate::utils::thread_count;

/// Read-time filter configuration.
///
/// `symmetric` emits both orientations of undirected input, `upper_triangle`
/// keeps only entries with `x <= y`, `drop_self_loops` removes `x == y`
/// records, `weighted` reads (and stores) the third column.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CooFlags {
    pub symmetric: bool,
    pub upper_triangle: bool,
    pub drop_self_loops: bool,
    pub weighted: bool,
}

/// Borrowed CSR columns, the narrow transfer contract consumed by
/// [`Coo::from_csr`]. `offsets` has one entry per vertex plus the closing
/// total, `endpoints` one entry per edge, `weights` one per edge when
/// present.
#[derive(Clone, Copy, Debug)]
pub struct CsrView<'a, L: Index, O: Index, W: Weight = f32> {
    pub offsets: &'a [O],
    pub endpoints: &'a [L],
    pub weights: Option<&'a [W]>,
}

/// Coordinate-list sparse structure: parallel `x`/`y` arrays, an optional
/// weight array, and the label-space dimensions. Immutable once built.
#[derive(Clone, Debug)]
pub struct Coo<L: Index = u32, O: Index = usize, W: Weight = f32> {
    x: Vec<L>,
    y: Vec<L>,
    w: Option<Vec<W>>,
    nrows: L,
    ncols: L,
    n: L,
    m: O,
    flags: CooFlags,
}

impl<L: Index, O: Index, W: Weight> Coo<L, O, W> {
    /// Read `path`, detecting the format from its leading bytes and
    /// filename suffix.
    pub fn from_file<P: AsRef<Path>>(path: P, flags: CooFlags) -> Result<Self> {
        let mut f = MappedFile::open_read(path)?;
        let format = f.guess_format()?;
        Self::read_from(&mut f, format, flags)
    }

    /// Read `path` as an explicitly chosen format.
    pub fn from_file_with<P: AsRef<Path>>(
        path: P,
        format: FileFormat,
        flags: CooFlags,
    ) -> Result<Self> {
        let mut f = MappedFile::open_read(path)?;
        Self::read_from(&mut f, format, flags)
    }

    fn read_from(f: &mut MappedFile, format: FileFormat, flags: CooFlags) -> Result<Self> {
        match format {
            FileFormat::MatrixMarket => {
                text_parser::read_matrix_market(f.reader(), flags, thread_count())
            }
            FileFormat::EdgeList => {
                text_parser::read_edge_list(f.reader(), flags, thread_count())
            }
            FileFormat::CooBin => bin_codec::load(f, flags),
            FileFormat::CsrBin | FileFormat::Graph => Err(Error::NotYetImplemented(
                "reading a COO through the CSR loader; convert via CsrView instead".into(),
            )),
            FileFormat::DigraphBin | FileFormat::TensorBin => Err(Error::NotYetImplemented(
                "reading a COO from a DiGraph or Tensor binary".into(),
            )),
        }
    }

    /// Convert borrowed CSR columns into a COO, vertex ranges in parallel.
    ///
    /// With `symmetric` and no `upper_triangle`, both orientations of every
    /// endpoint are emitted at stride two, weights duplicated verbatim.
    /// Triangle extraction and self-loop removal are not available on this
    /// path.
    pub fn from_csr(csr: CsrView<'_, L, O, W>, flags: CooFlags) -> Result<Self> {
        Self::from_csr_with(csr, flags, thread_count())
    }

    pub(crate) fn from_csr_with(
        csr: CsrView<'_, L, O, W>,
        flags: CooFlags,
        workers: usize,
    ) -> Result<Self> {
        if !flags.symmetric && flags.upper_triangle {
            return Err(Error::NotYetImplemented(
                "keeping only the upper triangle while converting from CSR".into(),
            ));
        }
        if flags.drop_self_loops {
            return Err(Error::NotYetImplemented(
                "removing self loops while converting from CSR".into(),
            ));
        }
        if csr.offsets.is_empty() {
            return Err(Error::InvalidSize(
                "CSR offsets must hold at least the closing total".into(),
            ));
        }
        let n = csr.offsets.len() - 1;
        let m_csr = csr.endpoints.len();
        if csr.offsets[n].to_usize() != m_csr {
            return Err(Error::InvalidSize(format!(
                "CSR closing offset {} disagrees with {} endpoints",
                csr.offsets[n], m_csr
            )));
        }
        let weights = if flags.weighted {
            match csr.weights {
                Some(ws) if ws.len() == m_csr => Some(ws),
                Some(ws) => {
                    return Err(Error::InvalidSize(format!(
                        "CSR weight column holds {} entries for {} endpoints",
                        ws.len(),
                        m_csr
                    )));
                }
                None => {
                    return Err(Error::InvalidSize(
                        "weighted conversion requested but the CSR has no weights".into(),
                    ));
                }
            }
        } else {
            None
        };

        let duplicate = flags.symmetric && !flags.upper_triangle;
        let m = if duplicate { m_csr * 2 } else { m_csr };

        let mut x = vec![L::default(); m];
        let mut y = vec![L::default(); m];
        let mut w = weights.map(|_| vec![W::default(); m]);

        {
            let xs = SharedSliceMut::from_slice(&mut x);
            let ys = SharedSliceMut::from_slice(&mut y);
            let ws = w.as_mut().map(|v| SharedSliceMut::from_slice(v));

            let workers = workers.max(1);
            let chunk = n.div_ceil(workers).max(1);
            thread::scope(|s| {
                for k in 0..workers {
                    let lo_v = (k * chunk).min(n);
                    let hi_v = ((k + 1) * chunk).min(n);
                    if lo_v == hi_v {
                        continue;
                    }
                    let mut xs = xs;
                    let mut ys = ys;
                    let mut ws = ws;
                    s.spawn(move |_| {
                        for v in lo_v..hi_v {
                            let lo = csr.offsets[v].to_usize();
                            let hi = csr.offsets[v + 1].to_usize();
                            let mut coo_cur = if duplicate { lo * 2 } else { lo };
                            for (i, &e) in csr.endpoints[lo..hi].iter().enumerate() {
                                let mut new_x = L::from_usize(v);
                                let mut new_y = e;
                                let wv = weights.map(|col| col[lo + i]);
                                if flags.symmetric && flags.upper_triangle {
                                    if new_x > new_y {
                                        std::mem::swap(&mut new_x, &mut new_y);
                                    }
                                } else if duplicate {
                                    *xs.get_mut(coo_cur) = new_y;
                                    *ys.get_mut(coo_cur) = new_x;
                                    if let (Some(ws), Some(wv)) = (ws.as_mut(), wv) {
                                        *ws.get_mut(coo_cur) = wv;
                                    }
                                    coo_cur += 1;
                                }
                                *xs.get_mut(coo_cur) = new_x;
                                *ys.get_mut(coo_cur) = new_y;
                                if let (Some(ws), Some(wv)) = (ws.as_mut(), wv) {
                                    *ws.get_mut(coo_cur) = wv;
                                }
                                coo_cur += 1;
                            }
                        }
                    });
                }
            })
            .map_err(|e| Error::IoFailure(format!("conversion worker panicked: {e:?}")))?;
        }

        Ok(Coo {
            x,
            y,
            w,
            nrows: L::from_usize(n),
            ncols: L::from_usize(n),
            n: L::from_usize(n),
            m: O::from_usize(m),
            flags,
        })
    }

    pub fn x(&self) -> &[L] {
        &self.x
    }

    pub fn y(&self) -> &[L] {
        &self.y
    }

    pub fn weights(&self) -> Option<&[W]> {
        self.w.as_deref()
    }

    pub fn nrows(&self) -> L {
        self.nrows
    }

    pub fn ncols(&self) -> L {
        self.ncols
    }

    /// The label-space bound, `max(nrows, ncols)`.
    pub fn n(&self) -> L {
        self.n
    }

    /// Edge count.
    pub fn m(&self) -> O {
        self.m
    }

    pub fn flags(&self) -> CooFlags {
        self.flags
    }

    /// Save in the native binary layout.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        bin_codec::save(self, path.as_ref())
    }

    /// Write as whitespace-delimited text, one `x y (w)?` record per line.
    pub fn write<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        text_writer::write(self, path.as_ref(), thread_count())
    }

    /// Write as a series of CSV files of `edge_per_file` records each.
    pub fn write_split_csv<P: AsRef<Path>>(
        &self,
        path: P,
        edge_per_file: usize,
        edge_ids: bool,
    ) -> Result<()> {
        text_writer::write_split_csv(self, path.as_ref(), edge_per_file, edge_ids, thread_count())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flags(symmetric: bool, upper_triangle: bool, weighted: bool) -> CooFlags {
        CooFlags {
            symmetric,
            upper_triangle,
            drop_self_loops: false,
            weighted,
        }
    }

    // path graph 0-1-2 stored as CSR with both directions
    fn path_csr() -> (Vec<usize>, Vec<u32>, Vec<f32>) {
        (
            vec![0usize, 1, 3, 4],
            vec![1u32, 0, 2, 1],
            vec![0.5f32, 0.5, 1.5, 1.5],
        )
    }

    #[test]
    fn csr_plain_conversion_keeps_order() {
        let (offsets, endpoints, _) = path_csr();
        let csr = CsrView::<u32, usize, f32> {
            offsets: &offsets,
            endpoints: &endpoints,
            weights: None,
        };
        let coo = Coo::<u32, usize, f32>::from_csr_with(csr, flags(false, false, false), 2).unwrap();
        assert_eq!(coo.m(), 4);
        assert_eq!(coo.x(), &[0, 1, 1, 2]);
        assert_eq!(coo.y(), &[1, 0, 2, 1]);
        assert_eq!(coo.n(), 3);
        assert!(coo.weights().is_none());
    }

    #[test]
    fn csr_symmetric_duplicates_with_weights() {
        let offsets = vec![0usize, 2, 2];
        let endpoints = vec![1u32, 1];
        let weights = vec![2.5f32, 7.0];
        let csr = CsrView {
            offsets: &offsets,
            endpoints: &endpoints,
            weights: Some(&weights),
        };
        let coo = Coo::<u32, usize, f32>::from_csr_with(csr, flags(true, false, true), 3).unwrap();
        assert_eq!(coo.m(), 4);
        // reversed orientation first, then the stored one, at stride two
        assert_eq!(coo.x(), &[1, 0, 1, 0]);
        assert_eq!(coo.y(), &[0, 1, 0, 1]);
        assert_eq!(coo.weights().unwrap(), &[2.5, 2.5, 7.0, 7.0]);
    }

    #[test]
    fn csr_upper_triangle_swaps_to_canonical() {
        let (offsets, endpoints, _) = path_csr();
        let csr = CsrView::<u32, usize, f32> {
            offsets: &offsets,
            endpoints: &endpoints,
            weights: None,
        };
        let coo = Coo::<u32, usize, f32>::from_csr_with(csr, flags(true, true, false), 2).unwrap();
        assert_eq!(coo.m(), 4);
        for (x, y) in coo.x().iter().zip(coo.y()) {
            assert!(x <= y);
        }
    }

    #[test]
    fn csr_unsupported_paths_fail() {
        let (offsets, endpoints, _) = path_csr();
        let csr = CsrView::<u32, usize, f32> {
            offsets: &offsets,
            endpoints: &endpoints,
            weights: None,
        };
        let err =
            Coo::<u32, usize, f32>::from_csr_with(csr, flags(false, true, false), 1).unwrap_err();
        assert!(matches!(err, Error::NotYetImplemented(_)));

        let mut fl = flags(true, false, false);
        fl.drop_self_loops = true;
        let err = Coo::<u32, usize, f32>::from_csr_with(csr, fl, 1).unwrap_err();
        assert!(matches!(err, Error::NotYetImplemented(_)));

        let err =
            Coo::<u32, usize, f32>::from_csr_with(csr, flags(false, false, true), 1).unwrap_err();
        assert!(matches!(err, Error::InvalidSize(_)));
    }

    #[test]
    fn from_file_detects_edge_lists() {
        let p = crate::test_common::temp_path("auto.el");
        crate::test_common::write_bytes(&p, b"1 2\n2 3\n3 1\n");
        let coo: Coo<u32, usize, f32> = Coo::from_file(&p, CooFlags::default()).unwrap();
        assert_eq!(coo.m(), 3);
        assert_eq!(coo.n(), 4);
        let _ = std::fs::remove_file(&p);
    }

    #[test]
    fn from_file_detects_matrix_market_by_suffix() {
        let p = crate::test_common::temp_path("auto.mtx");
        crate::test_common::write_bytes(
            &p,
            b"%%MatrixMarket matrix coordinate pattern general\n2 2 1\n1 2\n",
        );
        let coo: Coo<u32, usize, f32> = Coo::from_file(&p, CooFlags::default()).unwrap();
        assert_eq!(coo.m(), 1);
        assert_eq!(coo.x(), &[0]);
        assert_eq!(coo.y(), &[1]);
        let _ = std::fs::remove_file(&p);
    }

    #[test]
    fn from_file_detects_its_own_binaries() {
        let el = crate::test_common::temp_path("auto_src.el");
        crate::test_common::write_bytes(&el, b"1 2\n4 5\n");
        let coo: Coo<u32, usize, f32> = Coo::from_file(&el, CooFlags::default()).unwrap();

        let bin = crate::test_common::temp_path("auto.bin");
        coo.save(&bin).unwrap();
        let back: Coo<u32, usize, f32> = Coo::from_file(&bin, CooFlags::default()).unwrap();
        assert_eq!(back.x(), coo.x());
        assert_eq!(back.y(), coo.y());
        assert_eq!(back.m(), coo.m());

        let _ = std::fs::remove_file(&el);
        let _ = std::fs::remove_file(&bin);
    }

    #[test]
    fn graph_inputs_are_not_yet_readable() {
        let p = crate::test_common::temp_path("adj.graph");
        crate::test_common::write_bytes(&p, b"2 1\n2\n1\n");
        let err = Coo::<u32, usize, f32>::from_file(&p, CooFlags::default()).unwrap_err();
        assert!(matches!(err, Error::NotYetImplemented(_)));
        let _ = std::fs::remove_file(&p);
    }

    #[test]
    fn csr_inconsistent_offsets_fail() {
        let offsets = vec![0usize, 3];
        let endpoints = vec![1u32];
        let csr = CsrView::<u32, usize, f32> {
            offsets: &offsets,
            endpoints: &endpoints,
            weights: None,
        };
        let err =
            Coo::<u32, usize, f32>::from_csr_with(csr, flags(false, false, false), 1).unwrap_err();
        assert!(matches!(err, Error::InvalidSize(_)));
    }
}
