use itertools::Itertools;
use ndarray::Array2;
use prjcombine_gowin::Device;

/// Header line holding the two checksum bytes.
pub const HEADER_CHECKSUM_LINE: usize = 0;
/// Footer line holding the tagged checksum.
pub const FOOTER_CHECKSUM_LINE: usize = 1;
pub const FOOTER_CHECKSUM_TAG: u64 = 0x0a;

/// Packs one bit-grid row into bytes, last column first, MSB first; the final
/// byte is zero-padded.
pub fn pack_row<'a>(row: impl DoubleEndedIterator<Item = &'a u8>) -> Vec<u8> {
    row.rev()
        .chunks(8)
        .into_iter()
        .map(|chunk| {
            chunk
                .enumerate()
                .fold(0u8, |acc, (i, &bit)| acc | ((bit != 0) as u8) << (7 - i))
        })
        .collect()
}

pub fn pack_rows(data: &Array2<u8>) -> Vec<Vec<u8>> {
    data.rows().into_iter().map(|row| pack_row(row.iter())).collect()
}

pub fn checksum(data: &Array2<u8>) -> u16 {
    let (mut even, mut odd) = (0u32, 0u32);
    for (i, byte) in pack_rows(data).into_iter().flatten().enumerate() {
        if i % 2 == 0 {
            even = even.wrapping_add(byte as u32);
        } else {
            odd = odd.wrapping_add(byte as u32);
        }
    }
    (even.wrapping_mul(256).wrapping_add(odd) & 0xffff) as u16
}

/// A configuration image: fixed header lines, the bit grid, fixed footer lines.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Bitstream {
    pub header: Vec<Vec<u8>>,
    pub data: Array2<u8>,
    pub footer: Vec<Vec<u8>>,
}

fn put_line(lines: &mut Vec<Vec<u8>>, idx: usize, line: Vec<u8>) {
    if lines.len() <= idx {
        lines.resize(idx + 1, vec![]);
    }
    lines[idx] = line;
}

impl Bitstream {
    pub fn new(device: &Device, data: Array2<u8>) -> Self {
        Bitstream {
            header: device.header.clone(),
            data,
            footer: device.footer.clone(),
        }
    }

    pub fn checksum(&self) -> u16 {
        checksum(&self.data)
    }

    /// Writes the checksum into the header and footer slots.
    pub fn finalize(&mut self) -> u16 {
        let sum = self.checksum();
        log::info!("bitstream checksum {sum:#06x}");
        put_line(&mut self.header, HEADER_CHECKSUM_LINE, sum.to_be_bytes().to_vec());
        let tagged = FOOTER_CHECKSUM_TAG << 56 | sum as u64;
        put_line(&mut self.footer, FOOTER_CHECKSUM_LINE, tagged.to_be_bytes().to_vec());
        sum
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut res = vec![];
        for line in &self.header {
            res.extend_from_slice(line);
        }
        for row in pack_rows(&self.data) {
            res.extend(row);
        }
        for line in &self.footer {
            res.extend_from_slice(line);
        }
        res
    }
}
