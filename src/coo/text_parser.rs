use crossbeam::thread;

use crate::coo::{Coo, CooFlags};
use crate::cursor::Cursor;
use crate::error::{Error, Result};
use crate::partition::partition;
use crate::scalar::{Index, Weight, WeightKind};
use crate::shared_slice::SharedSliceMut;
use crate::utils::exclusive_prefix_sum;

/// Advance past the weight token without materializing it. Counting must
/// walk the exact byte path of the storing pass, so this mirrors
/// [`read_weight_token`] move for move.
fn scan_weight_token<W: Weight>(r: &mut Cursor<'_>) {
    match W::KIND {
        WeightKind::SignedInt => r.move_to_next_signed_int(),
        WeightKind::UnsignedInt => r.move_to_next_int(),
        WeightKind::Float => {
            r.move_to_fp();
            r.move_to_non_fp();
        }
    }
}

fn read_weight_token<W: Weight>(r: &mut Cursor<'_>) -> W {
    match W::KIND {
        WeightKind::SignedInt => {
            r.move_to_next_signed_int();
            let sign = r.read_sign();
            let magnitude = r.read_int::<u64>();
            W::from_parts(sign, magnitude)
        }
        WeightKind::UnsignedInt => {
            r.move_to_next_int();
            W::from_parts(1, r.read_int::<u64>())
        }
        WeightKind::Float => {
            r.move_to_fp();
            let v = r.read_fp();
            let w = W::from_f64(v);
            r.move_to_non_fp();
            w
        }
    }
}

/// Pass 1: count the records this worker will emit, filters applied.
///
/// `one_based` shifts labels down by one before filtering (Matrix Market
/// labels start at 1).
fn count_records<W: Weight>(r: &mut Cursor<'_>, flags: CooFlags, one_based: bool) -> usize {
    let mut records = 0usize;

    if !flags.symmetric && !flags.upper_triangle && !flags.drop_self_loops && !flags.weighted {
        // no filters and no weight column: only record boundaries matter
        while r.good() {
            r.move_to_next_int();
            r.move_to_non_int();
            if !r.good() {
                break;
            }
            r.move_to_eol();
            r.move_to_next_int();
            records += 1;
        }
        return records;
    }

    while r.good() {
        let mut x = r.read_int::<u64>();
        r.move_to_next_int();
        let mut y = r.read_int::<u64>();
        if flags.weighted {
            scan_weight_token::<W>(r);
        }
        if !r.good() {
            break;
        }
        r.move_to_eol();
        r.move_to_next_int();
        if one_based {
            x = x.saturating_sub(1);
            y = y.saturating_sub(1);
        }
        if flags.drop_self_loops && x == y {
            continue;
        }
        if !flags.symmetric && flags.upper_triangle && x > y {
            continue;
        }
        if flags.symmetric && !flags.upper_triangle && x != y {
            records += 1;
        }
        records += 1;
    }
    records
}

/// Pass 2: re-scan the same range, storing records from `coord_pos` up.
/// Returns the worker's (max row, max col) labels for the join-time
/// reduction.
#[allow(clippy::too_many_arguments)]
fn store_records<L: Index, W: Weight>(
    r: &mut Cursor<'_>,
    flags: CooFlags,
    one_based: bool,
    mut xs: SharedSliceMut<L>,
    mut ys: SharedSliceMut<L>,
    mut ws: Option<SharedSliceMut<W>>,
    mut coord_pos: usize,
) -> (u64, u64) {
    let mut max_row = 0u64;
    let mut max_col = 0u64;

    while r.good() {
        let mut x = r.read_int::<u64>();
        r.move_to_next_int();
        let mut y = r.read_int::<u64>();
        let wv = if flags.weighted {
            Some(read_weight_token::<W>(r))
        } else {
            None
        };
        if !r.good() {
            break;
        }
        r.move_to_eol();
        r.move_to_next_int();
        if one_based {
            x = x.saturating_sub(1);
            y = y.saturating_sub(1);
        }
        if flags.drop_self_loops && x == y {
            continue;
        }
        if !flags.symmetric && flags.upper_triangle && x > y {
            continue;
        }
        if flags.symmetric && flags.upper_triangle && x > y {
            std::mem::swap(&mut x, &mut y);
        }
        *xs.get_mut(coord_pos) = L::from_u64(x);
        *ys.get_mut(coord_pos) = L::from_u64(y);
        if let (Some(ws), Some(wv)) = (ws.as_mut(), wv) {
            *ws.get_mut(coord_pos) = wv;
        }
        coord_pos += 1;
        if flags.symmetric && !flags.upper_triangle && x != y {
            *xs.get_mut(coord_pos) = L::from_u64(y);
            *ys.get_mut(coord_pos) = L::from_u64(x);
            if let (Some(ws), Some(wv)) = (ws.as_mut(), wv) {
                *ws.get_mut(coord_pos) = wv;
            }
            coord_pos += 1;
        }
        if x > max_row {
            max_row = x;
        }
        if y > max_col {
            max_col = y;
        }
    }
    (max_row, max_col)
}

/// Two-pass parallel build over whitespace-separated records.
///
/// The range is partitioned along record boundaries once; pass 1 counts per
/// worker, an exclusive prefix sum fixes each worker's write base, pass 2
/// re-scans from the same start positions and stores into disjoint slots.
fn read_records<L: Index, O: Index, W: Weight>(
    r: Cursor<'_>,
    flags: CooFlags,
    workers: usize,
    one_based: bool,
) -> Result<Coo<L, O, W>> {
    let workers = workers.max(1);
    let parts = partition(&r, workers);

    let counts = thread::scope(|s| -> Result<Vec<usize>> {
        let mut handles = Vec::with_capacity(parts.len());
        for part in &parts {
            let mut rc = *part;
            handles.push(s.spawn(move |_| count_records::<W>(&mut rc, flags, one_based)));
        }
        let mut counts = Vec::with_capacity(handles.len());
        for (idx, handle) in handles.into_iter().enumerate() {
            counts.push(handle.join().map_err(|e| {
                Error::IoFailure(format!("count worker {idx} panicked: {e:?}"))
            })?);
        }
        Ok(counts)
    })
    .map_err(|e| Error::IoFailure(format!("count pass panicked: {e:?}")))??;

    let (bases, m) = exclusive_prefix_sum(&counts);

    let mut x = vec![L::default(); m];
    let mut y = vec![L::default(); m];
    let mut w = if flags.weighted {
        Some(vec![W::default(); m])
    } else {
        None
    };

    let xs = SharedSliceMut::from_slice(&mut x);
    let ys = SharedSliceMut::from_slice(&mut y);
    let ws = w.as_mut().map(|v| SharedSliceMut::from_slice(v));

    let maxima = thread::scope(|s| -> Result<Vec<(u64, u64)>> {
        let mut handles = Vec::with_capacity(parts.len());
        for (k, part) in parts.iter().enumerate() {
            let mut rs = *part;
            let base = bases[k];
            let ws = ws;
            handles.push(s.spawn(move |_| {
                store_records::<L, W>(&mut rs, flags, one_based, xs, ys, ws, base)
            }));
        }
        let mut maxima = Vec::with_capacity(handles.len());
        for (idx, handle) in handles.into_iter().enumerate() {
            maxima.push(handle.join().map_err(|e| {
                Error::IoFailure(format!("store worker {idx} panicked: {e:?}"))
            })?);
        }
        Ok(maxima)
    })
    .map_err(|e| Error::IoFailure(format!("store pass panicked: {e:?}")))??;

    let (max_row, max_col) = maxima
        .into_iter()
        .fold((0u64, 0u64), |(r0, c0), (r1, c1)| (r0.max(r1), c0.max(c1)));

    let nrows = max_row + 1;
    let ncols = max_col + 1;
    Ok(Coo {
        x,
        y,
        w,
        nrows: L::from_u64(nrows),
        ncols: L::from_u64(ncols),
        n: L::from_u64(nrows.max(ncols)),
        m: O::from_usize(m),
        flags,
    })
}

pub(crate) fn read_edge_list<L: Index, O: Index, W: Weight>(
    r: Cursor<'_>,
    flags: CooFlags,
    workers: usize,
) -> Result<Coo<L, O, W>> {
    read_records(r, flags, workers, false)
}

/// Matrix Market: the `%%MatrixMarket matrix coordinate <field> <symmetry>`
/// header, any number of comment lines, the `nrows ncols nnz` dimension
/// line, then ordinary records with 1-based labels (normalized to 0-based
/// while reading). The parsed totals are cross-checked against the header
/// afterwards.
pub(crate) fn read_matrix_market<L: Index, O: Index, W: Weight>(
    mut r: Cursor<'_>,
    flags: CooFlags,
    workers: usize,
) -> Result<Coo<L, O, W>> {
    if !r.read(b"%%MatrixMarket matrix coordinate") {
        return Err(Error::FormatUnsupported(
            "only `matrix coordinate` MatrixMarket files are handled".into(),
        ));
    }

    r.skip_space_tab();
    let field = r.read_word().to_vec();
    r.skip_space_tab();
    let symmetry = r.read_word().to_vec();

    match field.as_slice() {
        b"real" | b"double" | b"integer" => {
            if !flags.weighted {
                eprintln!(
                    "WARNING: reading MatrixMarket file with {} values and skipping them",
                    String::from_utf8_lossy(&field)
                );
            }
        }
        b"pattern" => {
            if flags.weighted {
                return Err(Error::FormatUnsupported(
                    "pattern MatrixMarket file cannot satisfy a weighted read".into(),
                ));
            }
        }
        b"complex" => {
            return Err(Error::FormatUnsupported(
                "`complex` MatrixMarket files are not handled".into(),
            ));
        }
        other => {
            return Err(Error::FormatUnsupported(format!(
                "unknown MatrixMarket field `{}`",
                String::from_utf8_lossy(other)
            )));
        }
    }

    match symmetry.as_slice() {
        b"symmetric" => {
            if !flags.symmetric {
                eprintln!(
                    "WARNING: reading a symmetric MatrixMarket file without symmetrizing, \
                     reverse edges will be missing"
                );
            }
        }
        b"general" | b"skew-symmetric" => {
            if flags.symmetric {
                eprintln!(
                    "WARNING: symmetrizing a {} MatrixMarket file, which may duplicate edges",
                    String::from_utf8_lossy(&symmetry)
                );
            }
        }
        other => {
            return Err(Error::FormatUnsupported(format!(
                "unsupported MatrixMarket symmetry `{}`",
                String::from_utf8_lossy(other)
            )));
        }
    }

    r.move_to_next_int();
    let nrows_hdr = r.read_int::<u64>();
    r.move_to_next_int();
    let ncols_hdr = r.read_int::<u64>();
    r.move_to_next_int();
    let nnz_hdr = r.read_int::<u64>();
    r.move_to_eol();
    r.move_to_next_int();

    let mut coo = read_records::<L, O, W>(r, flags, workers, true)?;

    // the header's dimensions win, unless the records outgrow them
    if nrows_hdr < coo.nrows.to_u64() {
        return Err(Error::HeaderContradiction(format!(
            "file holds row labels up to {} but the header declares {} rows",
            coo.nrows.to_u64() - 1,
            nrows_hdr
        )));
    }
    if ncols_hdr < coo.ncols.to_u64() {
        return Err(Error::HeaderContradiction(format!(
            "file holds col labels up to {} but the header declares {} cols",
            coo.ncols.to_u64() - 1,
            ncols_hdr
        )));
    }

    let m = coo.m.to_u64();
    if flags.symmetric {
        if m > 2 * nnz_hdr {
            return Err(Error::HeaderContradiction(format!(
                "parsed {} records but the header declares {} non-zeros",
                m, nnz_hdr
            )));
        }
    } else if flags.upper_triangle || flags.drop_self_loops {
        if m > nnz_hdr {
            return Err(Error::HeaderContradiction(format!(
                "parsed {} records but the header declares {} non-zeros",
                m, nnz_hdr
            )));
        }
    } else if m != nnz_hdr {
        return Err(Error::HeaderContradiction(format!(
            "parsed {} records but the header declares {} non-zeros",
            m, nnz_hdr
        )));
    }

    coo.nrows = L::from_u64(nrows_hdr);
    coo.ncols = L::from_u64(ncols_hdr);
    coo.n = L::from_u64(nrows_hdr.max(ncols_hdr));
    Ok(coo)
}
