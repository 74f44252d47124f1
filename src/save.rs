use std::io;
use std::path::{Path, PathBuf};

use log::info;
use tickboy_core::cartridge::Cartridge;

/// `game.gb` saves to `game.sav` next to it.
pub fn sav_path(rom: &Path) -> PathBuf {
    rom.with_extension("sav")
}

/// Restore battery RAM if the cartridge has a battery and a save exists.
/// Returns whether anything was loaded.
pub fn load_battery(cart: &mut Cartridge, path: &Path) -> io::Result<bool> {
    if !cart.has_battery() || cart.ram().is_empty() {
        return Ok(false);
    }
    match std::fs::read(path) {
        Ok(data) => {
            cart.load_ram(&data);
            info!("Loaded {} bytes of save RAM from {}", data.len(), path.display());
            Ok(true)
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

pub fn save_battery(cart: &Cartridge, path: &Path) -> io::Result<()> {
    if !cart.has_battery() || cart.ram().is_empty() {
        return Ok(());
    }
    std::fs::write(path, cart.ram())?;
    info!("Wrote save RAM to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tickboy_core::cartridge::ROM_PAGE_SIZE;

    fn cart(cart_type: u8) -> Cartridge {
        let mut rom = vec![0; 2 * ROM_PAGE_SIZE];
        rom[0x0147] = cart_type;
        rom[0x0149] = 0x02;
        Cartridge::load(rom).unwrap()
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = sav_path(&dir.path().join("game.gb"));
        assert_eq!(path.file_name().unwrap(), "game.sav");

        let mut original = cart(0x03);
        original.write(0x0000, 0x0A);
        original.write(0xA000, 0x42);
        save_battery(&original, &path).unwrap();

        let mut restored = cart(0x03);
        assert!(load_battery(&mut restored, &path).unwrap());
        assert_eq!(restored.ram()[0], 0x42);
    }

    #[test]
    fn missing_save_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut c = cart(0x03);
        assert!(!load_battery(&mut c, &dir.path().join("none.sav")).unwrap());
    }

    #[test]
    fn no_battery_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plain.sav");
        let c = cart(0x02);
        save_battery(&c, &path).unwrap();
        assert!(!path.exists());
    }
}
