//! Décodage du format NPY (sérialisation binaire des tableaux numpy)
//!
//! Structure d'un fichier:
//! - magic `\x93NUMPY` + version (majeure, mineure)
//! - longueur de l'en-tête: u16 LE (v1) ou u32 LE (v2, v3)
//! - en-tête: dict Python (`descr`, `fortran_order`, `shape`), ASCII ou UTF-8 (v3)
//! - données brutes
//!
//! Les vignettes du fournisseur raster arrivent parfois en tableau structuré
//! à un seul champ (`[('building_height', '<f4')]`): le champ unique est lu
//! comme un tableau simple.

use memchr::memmem;

use crate::{Grid, RasterError};

const MAGIC: &[u8] = b"\x93NUMPY";

/// Types de données numpy supportés
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dtype {
    Bool,
    U8,
    I8,
    U16,
    I16,
    U32,
    I32,
    I64,
    F32,
    F64,
}

impl Dtype {
    /// Taille d'un élément en octets
    pub fn size(self) -> usize {
        match self {
            Self::Bool | Self::U8 | Self::I8 => 1,
            Self::U16 | Self::I16 => 2,
            Self::U32 | Self::I32 | Self::F32 => 4,
            Self::I64 | Self::F64 => 8,
        }
    }

    /// Parse un code `descr` (`<f8`, `|u1`, `>i2`...).
    ///
    /// Retourne le type et `true` si big-endian.
    pub fn parse(descr: &str) -> Result<(Self, bool), RasterError> {
        let unsupported = || RasterError::UnsupportedDtype(descr.to_string());

        let mut chars = descr.chars();
        let order = chars.next().ok_or_else(unsupported)?;
        let big_endian = match order {
            '<' | '|' | '=' => false,
            '>' => true,
            _ => return Err(unsupported()),
        };

        let dtype = match chars.as_str() {
            "b1" => Self::Bool,
            "u1" => Self::U8,
            "i1" => Self::I8,
            "u2" => Self::U16,
            "i2" => Self::I16,
            "u4" => Self::U32,
            "i4" => Self::I32,
            "i8" => Self::I64,
            "f4" => Self::F32,
            "f8" => Self::F64,
            _ => return Err(unsupported()),
        };

        Ok((dtype, big_endian))
    }

    /// Lit un élément (la taille de `chunk` vaut `self.size()`)
    fn read(self, chunk: &[u8], big_endian: bool) -> f64 {
        macro_rules! num {
            ($t:ty, $n:expr) => {{
                let mut buf = [0u8; $n];
                buf.copy_from_slice(chunk);
                if big_endian {
                    <$t>::from_be_bytes(buf) as f64
                } else {
                    <$t>::from_le_bytes(buf) as f64
                }
            }};
        }

        match self {
            Self::Bool => f64::from(u8::from(chunk[0] != 0)),
            Self::U8 => f64::from(chunk[0]),
            Self::I8 => num!(i8, 1),
            Self::U16 => num!(u16, 2),
            Self::I16 => num!(i16, 2),
            Self::U32 => num!(u32, 4),
            Self::I32 => num!(i32, 4),
            Self::I64 => num!(i64, 8),
            Self::F32 => num!(f32, 4),
            Self::F64 => num!(f64, 8),
        }
    }
}

/// En-tête NPY décodé
#[derive(Debug, Clone, PartialEq)]
pub struct NpyHeader {
    pub dtype: Dtype,
    pub big_endian: bool,
    pub fortran_order: bool,
    pub shape: Vec<usize>,
}

/// Décode un tableau NPY 2D en `Grid` (valeurs converties en f64).
///
/// Une forme `(H, W, 1)` est acceptée et traitée comme `(H, W)`.
pub fn decode(bytes: &[u8]) -> Result<Grid, RasterError> {
    let (header, offset) = parse_header(bytes)?;

    let (rows, cols) = match header.shape.as_slice() {
        [rows, cols] | [rows, cols, 1] => (*rows, *cols),
        other => return Err(RasterError::NotTwoDimensional(other.to_vec())),
    };

    let size = header.dtype.size();
    let needed = rows
        .checked_mul(cols)
        .and_then(|n| n.checked_mul(size))
        .ok_or_else(|| RasterError::invalid_npy("shape overflows"))?;

    let payload = &bytes[offset..];
    if payload.len() < needed {
        return Err(RasterError::invalid_npy(format!(
            "truncated data: {} bytes, expected {}",
            payload.len(),
            needed
        )));
    }

    let values: Vec<f64> = payload[..needed]
        .chunks_exact(size)
        .map(|chunk| header.dtype.read(chunk, header.big_endian))
        .collect();

    let data = if header.fortran_order {
        // Colonne par colonne → ligne par ligne
        let mut row_major = Vec::with_capacity(values.len());
        for r in 0..rows {
            for c in 0..cols {
                row_major.push(values[c * rows + r]);
            }
        }
        row_major
    } else {
        values
    };

    Grid::new(rows, cols, data)
}

/// Parse l'en-tête et retourne la position du début des données
pub fn parse_header(bytes: &[u8]) -> Result<(NpyHeader, usize), RasterError> {
    if bytes.len() < 10 || !bytes.starts_with(MAGIC) {
        return Err(RasterError::invalid_npy("missing NPY magic"));
    }

    let (header_len, start): (usize, usize) = match bytes[6] {
        1 => (u16::from_le_bytes([bytes[8], bytes[9]]) as usize, 10),
        2 | 3 => {
            if bytes.len() < 12 {
                return Err(RasterError::invalid_npy("truncated header length"));
            }
            let len = u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]);
            (len as usize, 12)
        }
        v => {
            return Err(RasterError::invalid_npy(format!(
                "unsupported format version {}",
                v
            )))
        }
    };

    let end = start
        .checked_add(header_len)
        .filter(|&end| end <= bytes.len())
        .ok_or_else(|| RasterError::invalid_npy("header exceeds payload"))?;

    let text = simdutf8::basic::from_utf8(&bytes[start..end])
        .map_err(|_| RasterError::invalid_npy("header is not valid UTF-8"))?;

    let descr = parse_descr(dict_value(text, "descr")?)?;
    let (dtype, big_endian) = Dtype::parse(descr)?;

    let fortran_order = {
        let value = dict_value(text, "fortran_order")?;
        if value.starts_with("True") {
            true
        } else if value.starts_with("False") {
            false
        } else {
            return Err(RasterError::invalid_npy("invalid fortran_order"));
        }
    };

    let shape = parse_shape(dict_value(text, "shape")?)?;

    Ok((
        NpyHeader {
            dtype,
            big_endian,
            fortran_order,
            shape,
        },
        end,
    ))
}

/// Retourne le texte qui suit `'key':` dans le dict d'en-tête
fn dict_value<'a>(text: &'a str, key: &str) -> Result<&'a str, RasterError> {
    let pattern = format!("'{}'", key);
    let pos = memmem::find(text.as_bytes(), pattern.as_bytes())
        .ok_or_else(|| RasterError::invalid_npy(format!("missing key '{}'", key)))?;

    let rest = text[pos + pattern.len()..].trim_start();
    let rest = rest
        .strip_prefix(':')
        .ok_or_else(|| RasterError::invalid_npy(format!("malformed key '{}'", key)))?;

    Ok(rest.trim_start())
}

/// `'<f8'` ou `[('name', '<f4')]` (tableau structuré à un champ)
fn parse_descr(value: &str) -> Result<&str, RasterError> {
    if value.starts_with('[') {
        let close = value
            .find(']')
            .ok_or_else(|| RasterError::invalid_npy("unterminated structured descr"))?;
        let quoted = quoted_strings(&value[1..close]);
        return match quoted.as_slice() {
            [_name, dtype] => Ok(*dtype),
            _ => Err(RasterError::UnsupportedDtype(value[..=close].to_string())),
        };
    }

    quoted_strings(value)
        .into_iter()
        .next()
        .ok_or_else(|| RasterError::invalid_npy("invalid descr"))
}

/// Extrait les chaînes entre quotes simples (ou doubles) d'un fragment
fn quoted_strings(value: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut rest = value;
    while let Some(open) = rest.find(|c: char| c == '\'' || c == '"') {
        let quote = rest.as_bytes()[open] as char;
        let after = &rest[open + 1..];
        match after.find(quote) {
            Some(close) => {
                out.push(&after[..close]);
                rest = &after[close + 1..];
            }
            None => break,
        }
    }
    out
}

/// `(512, 512)` → `[512, 512]`
fn parse_shape(value: &str) -> Result<Vec<usize>, RasterError> {
    let inner = value
        .strip_prefix('(')
        .and_then(|v| v.find(')').map(|close| &v[..close]))
        .ok_or_else(|| RasterError::invalid_npy("invalid shape"))?;

    inner
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.trim_end_matches('L')
                .parse::<usize>()
                .map_err(|_| RasterError::invalid_npy(format!("invalid dimension '{}'", s)))
        })
        .collect()
}

/// Encode une grille en NPY v1 (`<f8`, ordre C)
pub fn encode(grid: &Grid) -> Vec<u8> {
    let (rows, cols) = grid.shape();
    let dict = format!(
        "{{'descr': '<f8', 'fortran_order': False, 'shape': ({}, {}), }}",
        rows, cols
    );

    // Alignement sur 16 octets (newline incluse)
    let unpadded = MAGIC.len() + 4 + dict.len() + 1;
    let pad = (16 - unpadded % 16) % 16;
    let header = format!("{}{}\n", dict, " ".repeat(pad));

    let mut out = Vec::with_capacity(10 + header.len() + grid.values().len() * 8);
    out.extend_from_slice(MAGIC);
    out.extend_from_slice(&[1, 0]);
    out.extend_from_slice(&(header.len() as u16).to_le_bytes());
    out.extend_from_slice(header.as_bytes());
    for value in grid.values() {
        out.extend_from_slice(&value.to_le_bytes());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn npy_v1(dict: &str, data: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(MAGIC);
        out.extend_from_slice(&[1, 0]);
        let header = format!("{}\n", dict);
        out.extend_from_slice(&(header.len() as u16).to_le_bytes());
        out.extend_from_slice(header.as_bytes());
        out.extend_from_slice(data);
        out
    }

    #[test]
    fn test_encode_then_decode() {
        let grid = Grid::new(2, 3, vec![0.0, 0.5, 1.0, 12.25, 40.0, 99.5]).unwrap();
        let bytes = encode(&grid);
        assert_eq!((bytes.len() - grid.values().len() * 8) % 16, 0);
        assert_eq!(decode(&bytes).unwrap(), grid);
    }

    #[test]
    fn test_decode_version_2_header() {
        // Longueur d'en-tête sur 4 octets, données à partir de l'octet 12 + len
        let header = "{'descr': '<f4', 'fortran_order': False, 'shape': (1, 2), }\n";
        let mut bytes = Vec::new();
        bytes.extend_from_slice(MAGIC);
        bytes.extend_from_slice(&[2, 0]);
        bytes.extend_from_slice(&(header.len() as u32).to_le_bytes());
        bytes.extend_from_slice(header.as_bytes());
        bytes.extend_from_slice(&1.5f32.to_le_bytes());
        bytes.extend_from_slice(&7.0f32.to_le_bytes());

        let (parsed, data_start) = parse_header(&bytes).unwrap();
        assert_eq!(data_start, 12 + header.len());
        assert_eq!(parsed.shape, vec![1, 2]);
        assert_eq!(decode(&bytes).unwrap().values(), &[1.5, 7.0]);
    }

    #[test]
    fn test_decode_u8() {
        let bytes = npy_v1(
            "{'descr': '|u1', 'fortran_order': False, 'shape': (2, 2), }",
            &[0, 1, 2, 255],
        );
        let grid = decode(&bytes).unwrap();
        assert_eq!(grid.values(), &[0.0, 1.0, 2.0, 255.0]);
    }

    #[test]
    fn test_decode_fortran_order() {
        // Colonnes: [1, 2], [3, 4] → lignes: [1, 3], [2, 4]
        let data: Vec<u8> = [1.0f32, 2.0, 3.0, 4.0]
            .iter()
            .flat_map(|v| v.to_le_bytes())
            .collect();
        let bytes = npy_v1(
            "{'descr': '<f4', 'fortran_order': True, 'shape': (2, 2), }",
            &data,
        );
        let grid = decode(&bytes).unwrap();
        assert_eq!(grid.values(), &[1.0, 3.0, 2.0, 4.0]);
    }

    #[test]
    fn test_decode_structured_single_field() {
        let data: Vec<u8> = [0.25f32, 0.75].iter().flat_map(|v| v.to_le_bytes()).collect();
        let bytes = npy_v1(
            "{'descr': [('building_presence', '<f4')], 'fortran_order': False, 'shape': (1, 2), }",
            &data,
        );
        let grid = decode(&bytes).unwrap();
        assert_eq!(grid.values(), &[0.25, 0.75]);
    }

    #[test]
    fn test_decode_big_endian() {
        let data: Vec<u8> = [300i16, -2].iter().flat_map(|v| v.to_be_bytes()).collect();
        let bytes = npy_v1(
            "{'descr': '>i2', 'fortran_order': False, 'shape': (1, 2), }",
            &data,
        );
        assert_eq!(decode(&bytes).unwrap().values(), &[300.0, -2.0]);
    }

    #[test]
    fn test_decode_rejects_bad_payloads() {
        assert!(matches!(
            decode(b"not a numpy file"),
            Err(RasterError::InvalidNpy(_))
        ));

        let one_dim = npy_v1(
            "{'descr': '<f8', 'fortran_order': False, 'shape': (4,), }",
            &[0u8; 32],
        );
        assert!(matches!(
            decode(&one_dim),
            Err(RasterError::NotTwoDimensional(_))
        ));

        let truncated = npy_v1(
            "{'descr': '<f8', 'fortran_order': False, 'shape': (2, 2), }",
            &[0u8; 16],
        );
        assert!(matches!(decode(&truncated), Err(RasterError::InvalidNpy(_))));

        let complex = npy_v1(
            "{'descr': '<c16', 'fortran_order': False, 'shape': (1, 1), }",
            &[0u8; 16],
        );
        assert!(matches!(
            decode(&complex),
            Err(RasterError::UnsupportedDtype(_))
        ));
    }

    #[test]
    fn test_dtype_parse() {
        assert_eq!(Dtype::parse("<f8").unwrap(), (Dtype::F64, false));
        assert_eq!(Dtype::parse(">u2").unwrap(), (Dtype::U16, true));
        assert_eq!(Dtype::parse("|b1").unwrap(), (Dtype::Bool, false));
        assert!(Dtype::parse("<U8").is_err());
    }

    #[test]
    fn test_parse_shape() {
        assert_eq!(parse_shape("(512, 512), }").unwrap(), vec![512, 512]);
        assert_eq!(parse_shape("(3,), }").unwrap(), vec![3]);
        assert!(parse_shape("512").is_err());
    }
}
