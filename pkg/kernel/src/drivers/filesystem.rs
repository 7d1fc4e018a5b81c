use super::ata::AtaDrive;
use crate::memory::KERNEL_ARENA;
use core::fmt::Write;
use storage::*;

pub type RootVolume = FatVolume<'static, AtaDrive>;

once_mutex!(pub ROOTFS: RootVolume);

guard_access_fn! {
    pub get_rootfs(ROOTFS: RootVolume)
}

/// Mounts the FAT volume on the primary master.
pub fn init() -> FsResult {
    info!("Opening disk device...");
    let drive = AtaDrive::open(0, 0)?;

    info!("Mounting filesystem...");
    let volume = FatVolume::mount(drive, &KERNEL_ARENA)?;
    trace!("Root filesystem: {:#?}", volume);

    let label = volume.volume_label();
    info!(
        "Mounted {:?} volume \"{}\"",
        volume.fat_type(),
        core::str::from_utf8(&label).unwrap_or("?").trim_end()
    );
    init_ROOTFS(volume);

    info!("Initialized Filesystem.");
    Ok(())
}

/// Console sink for the listing helpers.
struct Stdout;

impl Write for Stdout {
    fn write_str(&mut self, s: &str) -> core::fmt::Result {
        print!("{}", s);
        Ok(())
    }
}

/// Prints the root directory of the mounted volume.
pub fn ls() {
    let Some(volume) = get_rootfs() else {
        warn!("No filesystem mounted");
        return;
    };
    if let Err(err) = list_root(&*volume, &mut Stdout) {
        warn!("{}", err);
    }
}

/// Prints the file `name` from the mounted volume, returning its length.
pub fn cat(name: &str) -> FsResult<usize> {
    let mut volume = get_rootfs().ok_or(FsError::InvalidArgument)?;
    echo_file(&mut volume, name, &mut Stdout)
}

/// Writes a table of the root directory to `out`.
///
/// `out` is best-effort: its write errors are dropped and the result only
/// reports the volume. Returns the number of entries listed.
pub fn list_root<D: BlockDevice, W: Write>(volume: &FatVolume<D>, out: &mut W) -> FsResult<usize> {
    let _ = writeln!(
        out,
        "{:<12} {:<9} {:>10}  {}",
        "Name", "Type", "Size", "Last Modified"
    );

    volume.root_entries(|entry| {
        let kind = if entry.is_directory() { "Directory" } else { "File" };
        let (size, unit) = crate::humanized_size(entry.size as u64);
        let _ = writeln!(
            out,
            "{:<12} {:<9} {:>7.2} {:<2}  {}",
            entry.filename,
            kind,
            size,
            unit,
            entry.modified_time.naive_utc()
        );
    })
}

/// Copies the file `name` to `out`. Bytes that are not printable ASCII show as `.`.
///
/// Like [`list_root`], write errors from `out` are dropped; the returned count
/// is the bytes read from the file.
pub fn echo_file<D: BlockDevice, W: Write>(
    volume: &mut FatVolume<D>,
    name: &str,
    out: &mut W,
) -> FsResult<usize> {
    let mut handle = volume.open(name)?;
    let mut buf = [0u8; 128];
    let mut total = 0;

    loop {
        let n = volume.read(&mut handle, &mut buf)?;
        if n == 0 {
            break;
        }
        total += n;
        for &byte in &buf[..n] {
            let c = if byte.is_ascii_graphic() || byte.is_ascii_whitespace() {
                byte as char
            } else {
                '.'
            };
            let _ = out.write_char(c);
        }
    }

    debug!("Read {} bytes from {}", total, name);
    Ok(total)
}
