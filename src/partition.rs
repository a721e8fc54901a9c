use crate::cursor::Cursor;

/// Split `r`'s remaining range among `workers` scanners along record
/// boundaries.
///
/// Worker `k` starts at the proportional byte split and, for `k > 0`, skips
/// to the first integer after the next newline so no record straddles two
/// workers. Each worker's end bound is aligned the same way and becomes its
/// hard stopping point, so every record is scanned exactly once by exactly
/// one worker regardless of `workers`.
pub fn partition<'a>(r: &Cursor<'a>, workers: usize) -> Vec<Cursor<'a>> {
    let size = r.remaining();
    (0..workers)
        .map(|k| {
            let mut rs = r.at_offset(k * size / workers);
            let mut re = r.at_offset((k + 1) * size / workers);

            re.move_to_eol();
            re.move_to_next_int();
            if k != 0 {
                rs.move_to_eol();
                rs.move_to_next_int();
            } else {
                rs.move_to_first_int();
            }

            rs.clamp_end(&re);
            rs
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect_pairs(mut rs: Cursor<'_>) -> Vec<(u64, u64)> {
        let mut out = Vec::new();
        while rs.good() {
            let x = rs.read_int::<u64>();
            rs.move_to_next_int();
            let y = rs.read_int::<u64>();
            if !rs.good() {
                out.push((x, y));
                break;
            }
            rs.move_to_eol();
            rs.move_to_next_int();
            out.push((x, y));
        }
        out
    }

    #[test]
    fn every_record_lands_in_exactly_one_worker() {
        let mut text = String::new();
        let mut expected = Vec::new();
        for i in 0..100u64 {
            text.push_str(&format!("{} {}\n", i, i + 1));
            expected.push((i, i + 1));
        }
        let base = Cursor::new(text.as_bytes());

        for workers in [1usize, 2, 3, 7, 16] {
            let mut seen = Vec::new();
            for part in partition(&base, workers) {
                seen.extend(collect_pairs(part));
            }
            seen.sort_unstable();
            let mut want = expected.clone();
            want.sort_unstable();
            assert_eq!(seen, want, "workers = {workers}");
        }
    }

    #[test]
    fn worker_regions_are_ordered() {
        let text = "1 2\n3 4\n5 6\n7 8\n9 10\n";
        let base = Cursor::new(text.as_bytes());
        let parts = partition(&base, 3);
        for pair in parts.windows(2) {
            assert!(pair[0].pos() <= pair[1].pos());
        }
        // concatenated in order, the records stay in byte order
        let mut all = Vec::new();
        for part in parts {
            all.extend(collect_pairs(part));
        }
        assert_eq!(all, vec![(1, 2), (3, 4), (5, 6), (7, 8), (9, 10)]);
    }

    #[test]
    fn comments_at_boundaries_are_skipped() {
        let text = "% header\n1 2\n# note\n3 4\n% tail\n5 6\n";
        let base = Cursor::new(text.as_bytes());
        for workers in [1usize, 2, 4] {
            let mut seen = Vec::new();
            for part in partition(&base, workers) {
                seen.extend(collect_pairs(part));
            }
            seen.sort_unstable();
            assert_eq!(seen, vec![(1, 2), (3, 4), (5, 6)], "workers = {workers}");
        }
    }

    #[test]
    fn more_workers_than_records() {
        let text = "4 5\n";
        let base = Cursor::new(text.as_bytes());
        let mut seen = Vec::new();
        for part in partition(&base, 16) {
            seen.extend(collect_pairs(part));
        }
        assert_eq!(seen, vec![(4, 5)]);
    }
}
