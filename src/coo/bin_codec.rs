use std::path::Path;

use crate::coo::{Coo, CooFlags};
use crate::error::{Error, Result};
use crate::mapped_file::{MappedFile, COO_MAGIC};
use crate::scalar::{Index, Weight};

// On-disk layout, host-native byte order, tightly packed:
//   magic | L_size u8 | O_size u8 | nrows L | ncols L | n L | m O
//   | x[m] L | y[m] L | w[m] W (present iff weighted)

fn header_size<L: Index, O: Index>() -> usize {
    COO_MAGIC.len() + 2 + 3 * L::WIDTH as usize + O::WIDTH as usize
}

pub(crate) fn save<L: Index, O: Index, W: Weight>(
    coo: &Coo<L, O, W>,
    path: &Path,
) -> Result<()> {
    let m = coo.m().to_usize();
    let w_bytes = if coo.weights().is_some() {
        W::WIDTH as usize * m
    } else {
        0
    };
    let total = header_size::<L, O>() + 2 * L::WIDTH as usize * m + w_bytes;

    let mut f = MappedFile::open_write(path, total)?;
    f.write_bytes(COO_MAGIC);
    f.write::<u8>(L::WIDTH);
    f.write::<u8>(O::WIDTH);
    f.write::<L>(coo.nrows());
    f.write::<L>(coo.ncols());
    f.write::<L>(coo.n());
    f.write::<O>(coo.m());

    f.parallel_copy_in(bytemuck::cast_slice(coo.x()))?;
    f.parallel_copy_in(bytemuck::cast_slice(coo.y()))?;
    if let Some(w) = coo.weights() {
        f.parallel_copy_in(bytemuck::cast_slice(w))?;
    }
    Ok(())
}

pub(crate) fn load<L: Index, O: Index, W: Weight>(
    f: &mut MappedFile,
    flags: CooFlags,
) -> Result<Coo<L, O, W>> {
    f.advance(COO_MAGIC)?;

    let l_size = f.read::<u8>();
    let o_size = f.read::<u8>();
    if l_size != L::WIDTH {
        return Err(Error::TemplateSizeMismatch(format!(
            "file stores {l_size}-byte labels, reader instantiated with {}-byte labels",
            L::WIDTH
        )));
    }
    if o_size != O::WIDTH {
        return Err(Error::TemplateSizeMismatch(format!(
            "file stores {o_size}-byte edge counts, reader instantiated with {}-byte counts",
            O::WIDTH
        )));
    }

    let nrows = f.read::<L>();
    let ncols = f.read::<L>();
    let n = f.read::<L>();
    let m = f.read::<O>();
    let m_items = m.to_usize();

    let mut x = vec![L::default(); m_items];
    let mut y = vec![L::default(); m_items];
    f.parallel_copy_out(bytemuck::cast_slice_mut(&mut x))?;
    f.parallel_copy_out(bytemuck::cast_slice_mut(&mut y))?;
    let w = if flags.weighted {
        let mut w = vec![W::default(); m_items];
        f.parallel_copy_out(bytemuck::cast_slice_mut(&mut w))?;
        Some(w)
    } else {
        None
    };

    Ok(Coo {
        x,
        y,
        w,
        nrows,
        ncols,
        n,
        m,
        flags,
    })
}
