use crossbeam::thread;
use std::path::{Path, PathBuf};

use crate::coo::Coo;
use crate::error::{Error, Result};
use crate::mapped_file::MappedFile;
use crate::scalar::{Index, Weight};
use crate::utils::exclusive_prefix_sum;

// Scratch large enough for any rendered number (floats are bounded well
// below this by the shortest-roundtrip formatter).
const NUM_SCRATCH: usize = 1024;

fn edge_ranges(m: usize, workers: usize) -> Vec<(usize, usize)> {
    let workers = workers.max(1);
    let chunk = m.div_ceil(workers).max(1);
    (0..workers)
        .map(|k| ((k * chunk).min(m), ((k + 1) * chunk).min(m)))
        .collect()
}

/// Emit `x SPACE y (SPACE w)? NEWLINE` records.
///
/// Two passes: every worker first sums the rendered width of its edge
/// range, the per-worker totals are prefix-summed into file offsets, the
/// output file is mapped at its exact final size, and the same ranges are
/// rendered in place.
pub(crate) fn write<L: Index, O: Index, W: Weight>(
    coo: &Coo<L, O, W>,
    path: &Path,
    workers: usize,
) -> Result<()> {
    let m = coo.m().to_usize();
    let ranges = edge_ranges(m, workers);

    let sizes = thread::scope(|s| -> Result<Vec<usize>> {
        let mut handles = Vec::with_capacity(ranges.len());
        for &(lo, hi) in &ranges {
            handles.push(s.spawn(move |_| {
                let mut my_size = 0usize;
                for e in lo..hi {
                    my_size += Index::ascii_len(coo.x()[e]) + 1;
                    my_size += Index::ascii_len(coo.y()[e]);
                    if let Some(w) = coo.weights() {
                        my_size += 1 + Weight::ascii_len(w[e]);
                    }
                    my_size += 1;
                }
                my_size
            }));
        }
        let mut sizes = Vec::with_capacity(handles.len());
        for (idx, handle) in handles.into_iter().enumerate() {
            sizes.push(handle.join().map_err(|e| {
                Error::IoFailure(format!("sizing worker {idx} panicked: {e:?}"))
            })?);
        }
        Ok(sizes)
    })
    .map_err(|e| Error::IoFailure(format!("sizing pass panicked: {e:?}")))??;

    let (offsets, total) = exclusive_prefix_sum(&sizes);

    let mut f = MappedFile::open_write(path, total)?;
    let out = f.as_shared_mut();

    thread::scope(|s| {
        for (k, &(lo, hi)) in ranges.iter().enumerate() {
            if lo == hi {
                continue;
            }
            let mut view = out;
            let mut at = offsets[k];
            s.spawn(move |_| {
                let mut scratch = [0u8; NUM_SCRATCH];
                for e in lo..hi {
                    let n = Index::write_ascii(coo.x()[e], &mut scratch);
                    view.write_slice(at, &scratch[..n]);
                    at += n;
                    view.write_slice(at, b" ");
                    at += 1;
                    let n = Index::write_ascii(coo.y()[e], &mut scratch);
                    view.write_slice(at, &scratch[..n]);
                    at += n;
                    if let Some(w) = coo.weights() {
                        view.write_slice(at, b" ");
                        at += 1;
                        let n = Weight::write_ascii(w[e], &mut scratch);
                        view.write_slice(at, &scratch[..n]);
                        at += n;
                    }
                    view.write_slice(at, b"\n");
                    at += 1;
                }
            });
        }
    })
    .map_err(|e| Error::IoFailure(format!("emission pass panicked: {e:?}")))?;

    Ok(())
}

/// Emit the edges as CSV files of `edge_per_file` records each, named
/// `<path>.<k>.csv`. Each file starts with a `~from,~to,~label` style
/// header; rows are `(e<id>,)?v<x>,v<y>,con`.
pub(crate) fn write_split_csv<L: Index, O: Index, W: Weight>(
    coo: &Coo<L, O, W>,
    path: &Path,
    edge_per_file: usize,
    edge_ids: bool,
    workers: usize,
) -> Result<()> {
    if edge_per_file == 0 {
        return Err(Error::InvalidSize(
            "split CSV writing needs a positive edges-per-file".into(),
        ));
    }
    let m = coo.m().to_usize();
    let header: &[u8] = if edge_ids {
        b"~id,~from,~to,~label\n"
    } else {
        b"~from,~to,~label\n"
    };
    // ",con\n" plus the two `v` markers and the separating comma, plus the
    // `e` marker and its comma when ids are on
    let fixed = 5 + 3 + if edge_ids { 2 } else { 0 };

    let mut file_index = 0usize;
    let mut start = 0usize;
    loop {
        let end = (start + edge_per_file).min(m);
        let out_path = split_file_name(path, file_index);
        file_index += 1;

        let ranges: Vec<(usize, usize)> = edge_ranges(end - start, workers)
            .into_iter()
            .map(|(lo, hi)| (start + lo, start + hi))
            .collect();

        let sizes = thread::scope(|s| -> Result<Vec<usize>> {
            let mut handles = Vec::with_capacity(ranges.len());
            for &(lo, hi) in &ranges {
                handles.push(s.spawn(move |_| {
                    let mut my_size = 0usize;
                    for e in lo..hi {
                        my_size += fixed;
                        if edge_ids {
                            my_size += Index::ascii_len(e);
                        }
                        my_size += Index::ascii_len(coo.x()[e]);
                        my_size += Index::ascii_len(coo.y()[e]);
                    }
                    my_size
                }));
            }
            let mut sizes = Vec::with_capacity(handles.len());
            for (idx, handle) in handles.into_iter().enumerate() {
                sizes.push(handle.join().map_err(|e| {
                    Error::IoFailure(format!("sizing worker {idx} panicked: {e:?}"))
                })?);
            }
            Ok(sizes)
        })
        .map_err(|e| Error::IoFailure(format!("sizing pass panicked: {e:?}")))??;

        let (offsets, total) = exclusive_prefix_sum(&sizes);

        let mut f = MappedFile::open_write(&out_path, header.len() + total)?;
        f.write_bytes(header);
        let out = f.as_shared_mut();

        thread::scope(|s| {
            for (k, &(lo, hi)) in ranges.iter().enumerate() {
                if lo == hi {
                    continue;
                }
                let mut view = out;
                let mut at = header.len() + offsets[k];
                s.spawn(move |_| {
                    let mut scratch = [0u8; NUM_SCRATCH];
                    for e in lo..hi {
                        if edge_ids {
                            view.write_slice(at, b"e");
                            at += 1;
                            let n = Index::write_ascii(e, &mut scratch);
                            view.write_slice(at, &scratch[..n]);
                            at += n;
                            view.write_slice(at, b",");
                            at += 1;
                        }
                        view.write_slice(at, b"v");
                        at += 1;
                        let n = Index::write_ascii(coo.x()[e], &mut scratch);
                        view.write_slice(at, &scratch[..n]);
                        at += n;
                        view.write_slice(at, b",v");
                        at += 2;
                        let n = Index::write_ascii(coo.y()[e], &mut scratch);
                        view.write_slice(at, &scratch[..n]);
                        at += n;
                        view.write_slice(at, b",con\n");
                        at += 5;
                    }
                });
            }
        })
        .map_err(|e| Error::IoFailure(format!("emission pass panicked: {e:?}")))?;

        start += edge_per_file;
        if start > m {
            break;
        }
    }
    Ok(())
}

fn split_file_name(path: &Path, index: usize) -> PathBuf {
    PathBuf::from(format!("{}.{}.csv", path.display(), index))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coo::text_parser::read_edge_list;
    use crate::coo::CooFlags;
    use crate::cursor::Cursor;
    use crate::test_common::temp_path;
    use std::fs;

    fn parse<W: Weight>(text: &str, flags: CooFlags, workers: usize) -> Coo<u32, usize, W> {
        read_edge_list(Cursor::new(text.as_bytes()), flags, workers).unwrap()
    }

    #[test]
    fn writes_plain_records() {
        let coo = parse::<f32>("1 2\n2 3\n3 1\n", CooFlags::default(), 1);
        let p = temp_path("out.el");
        write(&coo, &p, 2).unwrap();
        assert_eq!(fs::read_to_string(&p).unwrap(), "1 2\n2 3\n3 1\n");
        let _ = fs::remove_file(&p);
    }

    #[test]
    fn writes_weighted_records() {
        let flags = CooFlags {
            weighted: true,
            ..CooFlags::default()
        };
        let coo = parse::<i32>("1 2 -7\n3 4 5\n", flags, 1);
        let p = temp_path("out_w.el");
        write(&coo, &p, 3).unwrap();
        assert_eq!(fs::read_to_string(&p).unwrap(), "1 2 -7\n3 4 5\n");
        let _ = fs::remove_file(&p);
    }

    #[test]
    fn text_roundtrip_preserves_the_edge_multiset() {
        let flags = CooFlags {
            weighted: true,
            ..CooFlags::default()
        };
        let mut text = String::new();
        for i in 0..150u64 {
            text.push_str(&format!("{} {} {}\n", i % 17, i % 23, i));
        }
        let coo = parse::<u64>(&text, flags, 4);
        let p = temp_path("rt.el");
        write(&coo, &p, 4).unwrap();

        let written = fs::read_to_string(&p).unwrap();
        let back: Coo<u32, usize, u64> =
            read_edge_list(Cursor::new(written.as_bytes()), flags, 3).unwrap();
        assert_eq!(back.m(), coo.m());
        assert_eq!(back.x(), coo.x());
        assert_eq!(back.y(), coo.y());
        assert_eq!(back.weights().unwrap(), coo.weights().unwrap());
        let _ = fs::remove_file(&p);
    }

    #[test]
    fn float_weights_survive_a_text_roundtrip() {
        let flags = CooFlags {
            weighted: true,
            ..CooFlags::default()
        };
        let coo = parse::<f64>("1 2 0.5\n2 3 -12.25\n", flags, 1);
        let p = temp_path("rt_f.el");
        write(&coo, &p, 2).unwrap();
        let written = fs::read_to_string(&p).unwrap();
        let back: Coo<u32, usize, f64> =
            read_edge_list(Cursor::new(written.as_bytes()), flags, 1).unwrap();
        for (a, b) in back
            .weights()
            .unwrap()
            .iter()
            .zip(coo.weights().unwrap())
        {
            assert!((a - b).abs() < 1e-9);
        }
        let _ = fs::remove_file(&p);
    }

    #[test]
    fn writing_an_empty_coo_fails_cleanly() {
        let coo = parse::<f32>("", CooFlags::default(), 1);
        let p = temp_path("empty_out.el");
        assert!(matches!(
            write(&coo, &p, 2),
            Err(Error::InvalidSize(_))
        ));
    }

    #[test]
    fn split_csv_chunks_and_headers() {
        let coo = parse::<f32>("1 2\n2 3\n3 1\n4 1\n", CooFlags::default(), 1);
        let p = temp_path("csv_base");
        write_split_csv(&coo, &p, 2, true, 2).unwrap();

        let f0 = fs::read_to_string(split_file_name(&p, 0)).unwrap();
        assert_eq!(f0, "~id,~from,~to,~label\ne0,v1,v2,con\ne1,v2,v3,con\n");
        let f1 = fs::read_to_string(split_file_name(&p, 1)).unwrap();
        assert_eq!(f1, "~id,~from,~to,~label\ne2,v3,v1,con\ne3,v4,v1,con\n");
        // the trailing boundary file carries only the header
        let f2 = fs::read_to_string(split_file_name(&p, 2)).unwrap();
        assert_eq!(f2, "~id,~from,~to,~label\n");
        assert!(!split_file_name(&p, 3).exists());

        for i in 0..3 {
            let _ = fs::remove_file(split_file_name(&p, i));
        }
    }

    #[test]
    fn split_csv_without_ids() {
        let coo = parse::<f32>("7 8\n", CooFlags::default(), 1);
        let p = temp_path("csv_noid");
        write_split_csv(&coo, &p, 10, false, 1).unwrap();
        let f0 = fs::read_to_string(split_file_name(&p, 0)).unwrap();
        assert_eq!(f0, "~from,~to,~label\nv7,v8,con\n");
        let _ = fs::remove_file(split_file_name(&p, 0));
    }

    #[test]
    fn split_csv_rejects_zero_chunk() {
        let coo = parse::<f32>("1 2\n", CooFlags::default(), 1);
        let p = temp_path("csv_zero");
        assert!(matches!(
            write_split_csv(&coo, &p, 0, true, 1),
            Err(Error::InvalidSize(_))
        ));
    }
}
