//! Dynamic section walking over the ELF64 layouts from `object`
//!
//! The backend is compiled for 64-bit Linux targets only.

use super::bindings::LoadedObject;
use object::elf::{
    Dyn64, Rela64, Sym64, DT_JMPREL, DT_NULL, DT_PLTRELSZ, DT_RELA, DT_RELASZ, DT_STRTAB,
    DT_SYMTAB,
};
use object::NativeEndian;

#[cfg(target_arch = "x86_64")]
use object::elf::{R_X86_64_GLOB_DAT as R_GLOB_DAT, R_X86_64_JUMP_SLOT as R_JUMP_SLOT};

#[cfg(target_arch = "aarch64")]
use object::elf::{R_AARCH64_GLOB_DAT as R_GLOB_DAT, R_AARCH64_JUMP_SLOT as R_JUMP_SLOT};

#[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
compile_error!("memtrace: GOT patching supports x86_64 and aarch64 only");

pub type Dyn = Dyn64<NativeEndian>;
pub type Rela = Rela64<NativeEndian>;
pub type Sym = Sym64<NativeEndian>;

/// GOT entry through which a function is called or its address taken
pub fn is_got_entry(rela: &Rela) -> bool {
    matches!(rela.r_type(NativeEndian, false), R_JUMP_SLOT | R_GLOB_DAT)
}

/// Offset of the relocated entry from the object's load base
pub fn entry_offset(rela: &Rela) -> usize {
    rela.r_offset.get(NativeEndian) as usize
}

/// Relocation tables of one loaded object
#[derive(Debug, Default, Clone, Copy)]
pub struct DynamicTables {
    pub symtab: usize,
    pub strtab: usize,
    pub jmprel: usize,
    pub pltrelsz: usize,
    pub rela: usize,
    pub relasz: usize,
}

impl DynamicTables {
    /// Reads the dynamic section of `object`
    ///
    /// # Safety
    /// `object` must describe an object that is still loaded
    pub unsafe fn read(object: &LoadedObject) -> Option<Self> {
        let mut entry = object.dynamic()? as *const Dyn;
        let mut tables = DynamicTables::default();

        loop {
            let tag = (*entry).d_tag.get(NativeEndian);
            if tag == u64::from(DT_NULL) {
                break;
            }
            let value = (*entry).d_val.get(NativeEndian) as usize;
            match u32::try_from(tag) {
                Ok(DT_SYMTAB) => tables.symtab = object.relocate(value),
                Ok(DT_STRTAB) => tables.strtab = object.relocate(value),
                Ok(DT_JMPREL) => tables.jmprel = object.relocate(value),
                Ok(DT_PLTRELSZ) => tables.pltrelsz = value,
                Ok(DT_RELA) => tables.rela = object.relocate(value),
                Ok(DT_RELASZ) => tables.relasz = value,
                _ => {}
            }
            entry = entry.add(1);
        }

        if tables.symtab == 0 || tables.strtab == 0 {
            return None;
        }
        Some(tables)
    }

    /// Every `JUMP_SLOT` and `GLOB_DAT` relocation
    ///
    /// # Safety
    /// The tables must belong to an object that is still loaded
    pub unsafe fn got_relocations(&self) -> impl Iterator<Item = &'static Rela> {
        let plt = relocations(self.jmprel, self.pltrelsz);
        let data = relocations(self.rela, self.relasz);
        plt.iter().chain(data.iter()).filter(|rela| is_got_entry(rela))
    }

    /// Name of the symbol a relocation refers to
    ///
    /// # Safety
    /// `rela` must come from these tables
    pub unsafe fn symbol_name(&self, rela: &Rela) -> &'static std::ffi::CStr {
        let index = rela.r_sym(NativeEndian, false) as usize;
        let symbol = &*(self.symtab as *const Sym).add(index);
        let offset = symbol.st_name.get(NativeEndian) as usize;
        std::ffi::CStr::from_ptr((self.strtab + offset) as *const libc::c_char)
    }
}

unsafe fn relocations(address: usize, size: usize) -> &'static [Rela] {
    if address == 0 || size == 0 {
        return &[];
    }
    std::slice::from_raw_parts(address as *const Rela, size / std::mem::size_of::<Rela>())
}

#[cfg(test)]
mod tests {
    use super::*;
    use object::{I64, U64};

    fn rela(symbol: u32, kind: u32) -> Rela {
        let mut rela = Rela {
            r_offset: U64::new(NativeEndian, 0x4018),
            r_info: U64::new(NativeEndian, 0),
            r_addend: I64::new(NativeEndian, 0),
        };
        rela.set_r_info(NativeEndian, false, symbol, kind);
        rela
    }

    #[test]
    fn test_got_entry_filter() {
        let jump = rela(5, R_JUMP_SLOT);
        assert_eq!(jump.r_sym(NativeEndian, false), 5);
        assert!(is_got_entry(&jump));
        assert!(is_got_entry(&rela(9, R_GLOB_DAT)));
        assert_eq!(entry_offset(&jump), 0x4018);

        // R_X86_64_RELATIVE / R_AARCH64_RELATIVE
        #[cfg(target_arch = "x86_64")]
        let relative = object::elf::R_X86_64_RELATIVE;
        #[cfg(target_arch = "aarch64")]
        let relative = object::elf::R_AARCH64_RELATIVE;
        assert!(!is_got_entry(&rela(0, relative)));
    }

    #[test]
    #[cfg_attr(miri, ignore = "FFI not supported in Miri")]
    fn test_read_libc_tables() {
        let libc = super::super::bindings::loaded_objects()
            .into_iter()
            .find(|o| o.name.contains("libc.so"))
            .unwrap();

        let tables = unsafe { DynamicTables::read(&libc) }.unwrap();
        assert_ne!(tables.symtab, 0);
        assert_ne!(tables.strtab, 0);
        let names: Vec<_> = unsafe {
            tables
                .got_relocations()
                .map(|rela| tables.symbol_name(rela).to_bytes().to_vec())
                .collect()
        };
        assert!(!names.is_empty());
    }
}
