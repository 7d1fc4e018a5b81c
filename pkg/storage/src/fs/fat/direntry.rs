//! Directory Entry
//!
//! reference: <https://wiki.osdev.org/FAT#Directories_on_FAT12.2F16.2F32>

use super::*;
use bitflags::bitflags;
use chrono::LocalResult::Single;
use chrono::{DateTime, TimeZone, Utc};
use core::fmt::{Debug, Display};

pub type FsTime = DateTime<Utc>;

#[derive(Debug, Eq, PartialEq, Clone)]
pub struct DirEntry {
    pub filename: ShortFileName,
    pub modified_time: FsTime,
    pub created_time: FsTime,
    pub accessed_time: FsTime,
    pub cluster: Cluster,
    pub attributes: Attributes,
    pub size: u32,
}

#[derive(Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct Cluster(pub u32);

bitflags! {
    /// File Attributes
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct Attributes: u8 {
        const READ_ONLY = 0x01;
        const HIDDEN    = 0x02;
        const SYSTEM    = 0x04;
        const VOLUME_ID = 0x08;
        const DIRECTORY = 0x10;
        const ARCHIVE   = 0x20;
        const LFN       = 0x0f;
    }
}

impl DirEntry {
    pub const LEN: usize = 0x20;

    /// Marks the end of a directory when found in the first name byte.
    pub const END_OF_DIRECTORY: u8 = 0x00;
    /// Marks a deleted entry when found in the first name byte.
    pub const DELETED: u8 = 0xE5;

    /// For Standard 8.3 format
    ///
    /// reference: https://osdev.org/FAT#Standard_8.3_format
    pub fn parse(data: &[u8]) -> FsResult<DirEntry> {
        let data: &[u8; Self::LEN] = data
            .get(..Self::LEN)
            .and_then(|d| d.try_into().ok())
            .ok_or(FsError::InvalidArgument)?;

        let filename = ShortFileName::new(&data[..11]);

        let le16 = |at: usize| u16::from_le_bytes([data[at], data[at + 1]]);
        let le32 = |at: usize| u32::from_le_bytes([data[at], data[at + 1], data[at + 2], data[at + 3]]);

        let created_time = parse_datetime(le32(14));
        let accessed_time = parse_datetime((le16(18) as u32) << 16);
        let modified_time = parse_datetime(le32(22));
        let attributes = Attributes::from_bits_retain(data[11]);
        let cluster = ((le16(20) as u32) << 16) | le16(26) as u32;
        let size = le32(28);

        Ok(DirEntry {
            filename,
            modified_time,
            created_time,
            accessed_time,
            cluster: Cluster(cluster),
            attributes,
            size,
        })
    }

    pub fn is_long_name(&self) -> bool {
        self.attributes == Attributes::LFN
    }

    pub fn is_directory(&self) -> bool {
        self.attributes.contains(Attributes::DIRECTORY)
    }

    pub fn is_volume_label(&self) -> bool {
        self.attributes.contains(Attributes::VOLUME_ID)
    }

    /// A regular file a lookup may return.
    pub fn is_file(&self) -> bool {
        !self.is_long_name() && !self.is_directory() && !self.is_volume_label()
    }
}

/// Decodes a packed FAT date (high half) and time (low half).
///
/// Date: day in [4:0], month in [8:5], years since 1980 in [15:9].
/// Time: two-second count in [4:0], minute in [10:5], hour in [15:11].
/// Unrepresentable values fall back to the Unix epoch.
fn parse_datetime(time: u32) -> FsTime {
    let date = (time >> 16) as u16;
    let time_field = time as u16;

    let day = (date & 0x1F) as u32;
    let month = ((date >> 5) & 0xF) as u32;
    let year = (((date >> 9) & 0x7F) + 1980) as i32;

    let sec = ((time_field & 0x1F) * 2) as u32;
    let min = ((time_field >> 5) & 0x3F) as u32;
    let hour = ((time_field >> 11) & 0x1F) as u32;

    if let Single(time) = Utc.with_ymd_and_hms(year, month, day, hour, min, sec) {
        time
    } else {
        DateTime::<Utc>::default()
    }
}

#[derive(PartialEq, Eq, Clone, Copy)]
pub struct ShortFileName {
    pub name: [u8; 8],
    pub ext: [u8; 3],
}

/// Bytes a short name may not contain, besides the control range.
const FORBIDDEN: &[u8] = b"\"*+,/:;<=>?[\\]| ";

impl ShortFileName {
    pub fn new(buf: &[u8]) -> Self {
        let mut name = [b' '; 8];
        let mut ext = [b' '; 3];
        name.copy_from_slice(&buf[..8]);
        ext.copy_from_slice(&buf[8..11]);
        Self { name, ext }
    }

    pub fn basename(&self) -> &str {
        core::str::from_utf8(&self.name).unwrap_or("????????")
    }

    pub fn extension(&self) -> &str {
        core::str::from_utf8(&self.ext).unwrap_or("???")
    }

    pub fn matches(&self, sfn: &ShortFileName) -> bool {
        self.name == sfn.name && self.ext == sfn.ext
    }

    /// The 11 on-disk bytes: name then extension, space padded.
    pub fn as_bytes(&self) -> [u8; 11] {
        let mut out = [b' '; 11];
        out[..8].copy_from_slice(&self.name);
        out[8..].copy_from_slice(&self.ext);
        out
    }

    /// Parse a short file name from a string.
    ///
    /// The part before the first `.` becomes the name, the rest the
    /// extension. Both are upper-cased (ASCII only) and right-padded with
    /// spaces, so `"file.txt"` becomes `"FILE    TXT"`.
    pub fn parse(name: &str) -> FsResult<ShortFileName> {
        if name.is_empty() {
            return Err(FilenameError::FilenameEmpty.into());
        }

        let (base, extension) = match name.split_once('.') {
            Some((base, extension)) => (base.as_bytes(), extension.as_bytes()),
            None => (name.as_bytes(), &[][..]),
        };

        if base.is_empty() {
            return Err(FilenameError::FilenameEmpty.into());
        }
        if extension.contains(&b'.') {
            return Err(FilenameError::MisplacedPeriod.into());
        }
        if base.len() > 8 || extension.len() > 3 {
            return Err(FilenameError::NameTooLong.into());
        }
        if base
            .iter()
            .chain(extension)
            .any(|&c| c < 0x20 || FORBIDDEN.contains(&c))
        {
            return Err(FilenameError::InvalidCharacter.into());
        }

        let mut sfn = ShortFileName {
            name: [b' '; 8],
            ext: [b' '; 3],
        };
        for (dst, src) in sfn.name.iter_mut().zip(base) {
            *dst = src.to_ascii_uppercase();
        }
        for (dst, src) in sfn.ext.iter_mut().zip(extension) {
            *dst = src.to_ascii_uppercase();
        }

        Ok(sfn)
    }
}

impl Debug for ShortFileName {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(f, "{}", self)
    }
}

impl Display for ShortFileName {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        let mut buf = [0u8; 12];
        let base = self.basename().trim_end();
        let mut len = base.len();
        buf[..len].copy_from_slice(base.as_bytes());
        if self.ext[0] != 0x20 {
            let ext = self.extension().trim_end();
            buf[len] = b'.';
            buf[len + 1..len + 1 + ext.len()].copy_from_slice(ext.as_bytes());
            len += 1 + ext.len();
        }
        // pad so that width and alignment flags apply to the whole name
        f.pad(core::str::from_utf8(&buf[..len]).unwrap_or("?"))
    }
}

impl Cluster {
    /// Unallocated, or the first cluster of an empty file.
    pub const EMPTY: Cluster = Cluster(0x0000_0000);
    /// Stands for the fixed FAT12/16 root region, which has no cluster number.
    pub const ROOT_DIR: Cluster = Cluster(0xFFFF_FFFC);
    /// What [`FatTable::next_cluster`] returns at the end of a chain.
    pub const END_OF_FILE: Cluster = Cluster(0xFFFF_FFFF);
}

impl Display for Cluster {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        match *self {
            Cluster::ROOT_DIR => f.write_str("<root>"),
            Cluster::END_OF_FILE => f.write_str("<eoc>"),
            Cluster(n) => write!(f, "#{}", n),
        }
    }
}

impl Debug for Cluster {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(f, "Cluster({:#x})", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dir_entry() {
        let data = hex_literal::hex!(
            "48 45 4c 4c 4f 20 20 20 54 58 54 21 00 00 c0 63
             21 59 21 59 00 00 e5 41 22 59 05 00 34 12 00 00"
        );

        let entry = DirEntry::parse(&data).unwrap();

        assert_eq!(&entry.filename.name, b"HELLO   ");
        assert_eq!(&entry.filename.ext, b"TXT");
        assert_eq!(entry.attributes, Attributes::READ_ONLY | Attributes::ARCHIVE);
        assert_eq!(entry.cluster, Cluster(5));
        assert_eq!(entry.size, 0x1234);
        assert!(entry.is_file());

        let at = |y, mo, d, h, mi, s| Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap();
        assert_eq!(entry.created_time, at(2024, 9, 1, 12, 30, 0));
        assert_eq!(entry.modified_time, at(2024, 9, 2, 8, 15, 10));
        // access records carry a date only
        assert_eq!(entry.accessed_time, at(2024, 9, 1, 0, 0, 0));
    }

    #[test]
    fn test_high_cluster_word() {
        let mut data = [0u8; 32];
        data[..11].copy_from_slice(b"BIG     BIN");
        data[20..22].copy_from_slice(&0x0001u16.to_le_bytes());
        data[26..28].copy_from_slice(&0x0203u16.to_le_bytes());

        let res = DirEntry::parse(&data).unwrap();
        assert_eq!(res.cluster, Cluster(0x0001_0203));
        // zeroed timestamps are not valid dates
        assert_eq!(res.modified_time, DateTime::<Utc>::default());
    }

    #[test]
    fn test_entry_kinds() {
        let mut data = [0u8; 32];
        data[..11].copy_from_slice(b"A       B  ");

        data[11] = 0x0f;
        assert!(DirEntry::parse(&data).unwrap().is_long_name());

        data[11] = 0x10;
        let dir = DirEntry::parse(&data).unwrap();
        assert!(dir.is_directory() && !dir.is_file());

        data[11] = 0x08;
        assert!(DirEntry::parse(&data).unwrap().is_volume_label());

        assert_eq!(DirEntry::parse(&data[..31]), Err(FsError::InvalidArgument));
    }

    #[test]
    fn test_short_name_normalization() {
        let parse = |name| ShortFileName::parse(name).unwrap().as_bytes();

        assert_eq!(&parse("file.txt"), b"FILE    TXT");
        assert_eq!(&parse("FILE.TXT"), b"FILE    TXT");
        assert_eq!(&parse("file"), b"FILE       ");
        assert_eq!(&parse("a.b"), b"A       B  ");
        assert_eq!(&parse("kernel.elf"), b"KERNEL  ELF");
    }

    #[test]
    fn test_short_name_errors() {
        let err = |name| ShortFileName::parse(name).unwrap_err();

        assert_eq!(err(""), FilenameError::FilenameEmpty.into());
        assert_eq!(err(".txt"), FilenameError::FilenameEmpty.into());
        assert_eq!(err("toolongname.txt"), FilenameError::NameTooLong.into());
        assert_eq!(err("file.text"), FilenameError::NameTooLong.into());
        assert_eq!(err("a.b.c"), FilenameError::MisplacedPeriod.into());
        assert_eq!(err("a b.txt"), FilenameError::InvalidCharacter.into());
        assert_eq!(err("a*.txt"), FilenameError::InvalidCharacter.into());
    }

    #[test]
    fn test_short_name_display() {
        assert_eq!(format!("{}", ShortFileName::new(b"HELLO   TXT")), "HELLO.TXT");
        assert_eq!(format!("{}", ShortFileName::new(b"README     ")), "README");
        assert_eq!(format!("{:<10}|", ShortFileName::new(b"A       B  ")), "A.B       |");
        assert!(ShortFileName::new(b"HELLO   TXT").matches(&ShortFileName::parse("hello.txt").unwrap()));
    }
}
