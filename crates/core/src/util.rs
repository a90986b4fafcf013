/// 32-bit FNV-1a over the code points of `text`.
pub(crate) fn fnv1a32(text: &str) -> u32 {
    const FNV_OFFSET_BASIS: u32 = 2_166_136_261;
    const FNV_PRIME: u32 = 16_777_619;

    let mut hash = FNV_OFFSET_BASIS;
    for ch in text.chars() {
        hash ^= ch as u32;
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

/// Bernstein's djb2 (`h * 33 + c`), truncated to 32 bits.
pub(crate) fn djb2(text: &str) -> u32 {
    let mut hash: u32 = 5381;
    for ch in text.chars() {
        hash = (hash << 5).wrapping_add(hash).wrapping_add(ch as u32);
    }
    hash
}

/// sdbm (`c + (h << 6) + (h << 16) - h`), truncated to 32 bits.
pub(crate) fn sdbm(text: &str) -> u32 {
    let mut hash: u32 = 0;
    for ch in text.chars() {
        hash = (ch as u32)
            .wrapping_add(hash << 6)
            .wrapping_add(hash << 16)
            .wrapping_sub(hash);
    }
    hash
}

pub(crate) fn fnv1a64(bytes: &[u8]) -> u64 {
    const FNV_OFFSET_BASIS: u64 = 0xcbf29ce484222325;
    const FNV_PRIME: u64 = 0x100000001b3;

    let mut hash = FNV_OFFSET_BASIS;
    for &b in bytes {
        hash ^= u64::from(b);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

pub(crate) fn escape_markup(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    for ch in line.chars() {
        match ch {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(ch),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fnv1a32_matches_reference_values() {
        assert_eq!(fnv1a32(""), 0x811c9dc5);
        assert_eq!(fnv1a32("a"), 0xe40c292c);
        assert_eq!(fnv1a32("foobar"), 0xbf9cf968);
    }

    #[test]
    fn djb2_matches_reference_values() {
        assert_eq!(djb2(""), 5381);
        assert_eq!(djb2("a"), 5381 * 33 + 97);
        assert_eq!(djb2("ab"), (5381 * 33 + 97) * 33 + 98);
    }

    #[test]
    fn sdbm_matches_reference_values() {
        assert_eq!(sdbm(""), 0);
        assert_eq!(sdbm("a"), 97);
        assert_eq!(sdbm("ab"), 98 + (97 << 6) + (97 << 16) - 97);
    }

    #[test]
    fn hashes_wrap_instead_of_overflowing() {
        let long = "x".repeat(10_000);
        let _ = (fnv1a32(&long), djb2(&long), sdbm(&long));
        assert_eq!(djb2(&long), djb2(&long));
    }

    #[test]
    fn escape_markup_only_touches_angle_brackets() {
        assert_eq!(escape_markup("a < b && c > d"), "a &lt; b && c &gt; d");
    }
}
