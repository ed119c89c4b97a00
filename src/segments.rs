//! Scatter/gather input: an ordered list of borrowed byte ranges that every consumer treats as
//! one contiguous message.

use bytes::BytesMut;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Segments<'a> {
    parts: Vec<&'a [u8]>,
}

impl<'a> Segments<'a> {
    pub fn new(parts: &[&'a [u8]]) -> Self {
        Self {
            parts: parts.iter().copied().filter(|p| !p.is_empty()).collect(),
        }
    }

    pub fn single(bytes: &'a [u8]) -> Self {
        Self::new(&[bytes])
    }

    pub fn len(&self) -> usize {
        self.parts.iter().map(|p| p.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &'a [u8]> + '_ {
        self.parts.iter().copied()
    }

    /// Splits the logical stream at `mid` without copying. A `mid` past the end puts every byte
    /// in the head.
    pub fn split_at(&self, mid: usize) -> (Segments<'a>, Segments<'a>) {
        let mut head = Vec::new();
        let mut tail = Vec::new();
        let mut remaining = mid;
        for part in self.iter() {
            if remaining >= part.len() {
                head.push(part);
                remaining -= part.len();
            } else if remaining == 0 {
                tail.push(part);
            } else {
                let (h, t) = part.split_at(remaining);
                head.push(h);
                tail.push(t);
                remaining = 0;
            }
        }
        (Segments { parts: head }, Segments { parts: tail })
    }

    /// Copies the whole stream into `out`, which must be exactly `self.len()` bytes.
    pub fn copy_to_slice(&self, out: &mut [u8]) {
        assert_eq!(
            out.len(),
            self.len(),
            "Invariant broken: segment copy into a buffer of the wrong size"
        );
        let mut offset = 0;
        for part in self.iter() {
            out[offset..offset + part.len()].copy_from_slice(part);
            offset += part.len();
        }
    }

    /// Appends the whole stream to `out`.
    pub fn gather_into(&self, out: &mut BytesMut) {
        out.reserve(self.len());
        for part in self.iter() {
            out.extend_from_slice(part);
        }
    }

    pub fn to_vec(&self) -> Vec<u8> {
        let mut out = vec![0; self.len()];
        self.copy_to_slice(&mut out);
        out
    }
}

impl<'a> From<&'a [u8]> for Segments<'a> {
    fn from(bytes: &'a [u8]) -> Self {
        Self::single(bytes)
    }
}
