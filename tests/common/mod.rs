//! Synthetic executables for the integration tests.
//!
//! Each builder lays out just enough of a container for the resolvers: headers, a code
//! section holding caller-provided bytes at a chosen file offset, and a symbol table.

#![allow(dead_code)]

use object::endian::{BigEndian, U16, U32, U64, U64Bytes};
use object::pod::bytes_of;
use object::{elf, macho, Endianness};

const LE: Endianness = Endianness::Little;

fn le16(v: u16) -> U16<Endianness> {
    U16::new(LE, v)
}
fn le32(v: u32) -> U32<Endianness> {
    U32::new(LE, v)
}
fn le64(v: u64) -> U64<Endianness> {
    U64::new(LE, v)
}
fn be32(v: u32) -> U32<BigEndian> {
    U32::new(BigEndian, v)
}

fn pad_to(buffer: &mut Vec<u8>, offset: usize) {
    assert!(buffer.len() <= offset, "fixture sections overlap");
    buffer.resize(offset, 0);
}

fn align(buffer: &mut Vec<u8>, to: usize) {
    let len = buffer.len().div_ceil(to) * to;
    buffer.resize(len, 0);
}

fn name16(name: &str) -> [u8; 16] {
    let mut out = [0u8; 16];
    out[..name.len()].copy_from_slice(name.as_bytes());
    out
}

/// Recognisable filler so a resolved offset can be checked by reading it back.
pub fn code(len: usize, seed: u8) -> Vec<u8> {
    (0..len).map(|i| seed.wrapping_add(i as u8)).collect()
}

// ---------------------------------------------------------------------------------------
// ELF

pub struct ElfSymbol<'a> {
    pub name: &'a str,
    pub value: u64,
    pub size: u64,
}

/// A 64-bit little-endian ELF executable with `.text`, `.symtab`, `.strtab`, `.shstrtab`.
pub fn elf_image(
    machine: u16,
    text_offset: u64,
    text_addr: u64,
    text: &[u8],
    symbols: &[ElfSymbol],
) -> Vec<u8> {
    let mut buffer = vec![0u8; 64];

    pad_to(&mut buffer, text_offset as usize);
    buffer.extend_from_slice(text);

    let mut strtab = vec![0u8];
    let mut syms = vec![elf::Sym64::<Endianness> {
        st_name: le32(0),
        st_info: 0,
        st_other: 0,
        st_shndx: le16(0),
        st_value: le64(0),
        st_size: le64(0),
    }];
    for sym in symbols {
        syms.push(elf::Sym64 {
            st_name: le32(strtab.len() as u32),
            st_info: (elf::STB_GLOBAL << 4) | elf::STT_FUNC,
            st_other: elf::STV_DEFAULT,
            st_shndx: le16(1),
            st_value: le64(sym.value),
            st_size: le64(sym.size),
        });
        strtab.extend_from_slice(sym.name.as_bytes());
        strtab.push(0);
    }

    align(&mut buffer, 8);
    let symtab_offset = buffer.len();
    for sym in &syms {
        buffer.extend_from_slice(bytes_of(sym));
    }
    let symtab_size = buffer.len() - symtab_offset;

    let strtab_offset = buffer.len();
    buffer.extend_from_slice(&strtab);

    let shstrtab = b"\0.text\0.symtab\0.strtab\0.shstrtab\0";
    let shstrtab_offset = buffer.len();
    buffer.extend_from_slice(shstrtab);

    align(&mut buffer, 8);
    let shoff = buffer.len();
    let section = |name: u32, sh_type: u32, flags: u64, addr: u64, offset: usize, size: usize| {
        elf::SectionHeader64::<Endianness> {
            sh_name: le32(name),
            sh_type: le32(sh_type),
            sh_flags: le64(flags),
            sh_addr: le64(addr),
            sh_offset: le64(offset as u64),
            sh_size: le64(size as u64),
            sh_link: le32(0),
            sh_info: le32(0),
            sh_addralign: le64(1),
            sh_entsize: le64(0),
        }
    };
    let headers = [
        section(0, elf::SHT_NULL, 0, 0, 0, 0),
        section(
            1,
            elf::SHT_PROGBITS,
            (elf::SHF_ALLOC | elf::SHF_EXECINSTR) as u64,
            text_addr,
            text_offset as usize,
            text.len(),
        ),
        elf::SectionHeader64 {
            sh_link: le32(3),
            sh_info: le32(1),
            sh_addralign: le64(8),
            sh_entsize: le64(24),
            ..section(7, elf::SHT_SYMTAB, 0, 0, symtab_offset, symtab_size)
        },
        section(15, elf::SHT_STRTAB, 0, 0, strtab_offset, strtab.len()),
        section(23, elf::SHT_STRTAB, 0, 0, shstrtab_offset, shstrtab.len()),
    ];
    for header in &headers {
        buffer.extend_from_slice(bytes_of(header));
    }

    let file_header = elf::FileHeader64::<Endianness> {
        e_ident: elf::Ident {
            magic: elf::ELFMAG,
            class: elf::ELFCLASS64,
            data: elf::ELFDATA2LSB,
            version: elf::EV_CURRENT,
            os_abi: elf::ELFOSABI_SYSV,
            abi_version: 0,
            padding: [0; 7],
        },
        e_type: le16(elf::ET_EXEC),
        e_machine: le16(machine),
        e_version: le32(elf::EV_CURRENT as u32),
        e_entry: le64(text_addr),
        e_phoff: le64(0),
        e_shoff: le64(shoff as u64),
        e_flags: le32(0),
        e_ehsize: le16(64),
        e_phentsize: le16(56),
        e_phnum: le16(0),
        e_shentsize: le16(64),
        e_shnum: le16(headers.len() as u16),
        e_shstrndx: le16(4),
    };
    buffer[..64].copy_from_slice(bytes_of(&file_header));
    buffer
}

// ---------------------------------------------------------------------------------------
// Mach-O

pub struct MachSection<'a> {
    pub name: &'a str,
    pub addr: u64,
    /// Offset inside the slice.
    pub offset: u32,
    pub data: &'a [u8],
}

pub struct MachSymbol<'a> {
    pub name: &'a str,
    /// 1-based section number.
    pub sect: u8,
    pub value: u64,
}

/// A little-endian 64-bit Mach-O executable with one `__TEXT` segment.
pub fn macho_image(cputype: u32, sections: &[MachSection], symbols: &[MachSymbol]) -> Vec<u8> {
    let header_size = 32;
    let segment_size = 72 + 80 * sections.len();
    let symtab_cmd_size = 24;
    let commands_end = header_size + segment_size + symtab_cmd_size;

    let mut body = Vec::new();
    let mut layout = Vec::new();
    for section in sections {
        let start = section.offset as usize;
        assert!(start >= commands_end, "section overlaps load commands");
        pad_to(&mut body, start);
        body.extend_from_slice(section.data);
        layout.push(macho::Section64::<Endianness> {
            sectname: name16(section.name),
            segname: name16("__TEXT"),
            addr: le64(section.addr),
            size: le64(section.data.len() as u64),
            offset: le32(section.offset),
            align: le32(4),
            reloff: le32(0),
            nreloc: le32(0),
            flags: le32(0),
            reserved1: le32(0),
            reserved2: le32(0),
            reserved3: le32(0),
        });
    }

    let mut strings = vec![0u8];
    let mut nlists = Vec::new();
    for sym in symbols {
        nlists.push(macho::Nlist64::<Endianness> {
            n_strx: le32(strings.len() as u32),
            n_type: macho::N_SECT | macho::N_EXT,
            n_sect: sym.sect,
            n_desc: le16(0),
            n_value: U64Bytes::new(LE, sym.value),
        });
        strings.extend_from_slice(sym.name.as_bytes());
        strings.push(0);
    }

    align(&mut body, 8);
    let symoff = body.len();
    for nlist in &nlists {
        body.extend_from_slice(bytes_of(nlist));
    }
    let stroff = body.len();
    body.extend_from_slice(&strings);

    let vmaddr = sections.iter().map(|s| s.addr).min().unwrap_or(0);
    let header = macho::MachHeader64::<Endianness> {
        magic: be32(macho::MH_CIGAM_64),
        cputype: le32(cputype),
        cpusubtype: le32(0),
        filetype: le32(macho::MH_EXECUTE),
        ncmds: le32(2),
        sizeofcmds: le32((segment_size + symtab_cmd_size) as u32),
        flags: le32(0),
        reserved: le32(0),
    };
    let segment = macho::SegmentCommand64::<Endianness> {
        cmd: le32(macho::LC_SEGMENT_64),
        cmdsize: le32(segment_size as u32),
        segname: name16("__TEXT"),
        vmaddr: le64(vmaddr),
        vmsize: le64(body.len() as u64),
        fileoff: le64(0),
        filesize: le64(body.len() as u64),
        maxprot: le32(5),
        initprot: le32(5),
        nsects: le32(sections.len() as u32),
        flags: le32(0),
    };
    let symtab = macho::SymtabCommand::<Endianness> {
        cmd: le32(macho::LC_SYMTAB),
        cmdsize: le32(symtab_cmd_size as u32),
        symoff: le32(symoff as u32),
        nsyms: le32(nlists.len() as u32),
        stroff: le32(stroff as u32),
        strsize: le32(strings.len() as u32),
    };

    let mut commands = Vec::new();
    commands.extend_from_slice(bytes_of(&header));
    commands.extend_from_slice(bytes_of(&segment));
    for section in &layout {
        commands.extend_from_slice(bytes_of(section));
    }
    commands.extend_from_slice(bytes_of(&symtab));
    assert_eq!(commands.len(), commands_end);

    if body.len() < commands_end {
        body.resize(commands_end, 0);
    }
    body[..commands_end].copy_from_slice(&commands);
    body
}

/// A universal binary holding `slices` as `(cputype, offset, image)`.
pub fn fat_image(slices: &[(u32, u32, Vec<u8>)]) -> Vec<u8> {
    let mut buffer = Vec::new();
    buffer.extend_from_slice(bytes_of(&macho::FatHeader {
        magic: be32(macho::FAT_MAGIC),
        nfat_arch: be32(slices.len() as u32),
    }));
    for (cputype, offset, image) in slices {
        buffer.extend_from_slice(bytes_of(&macho::FatArch32 {
            cputype: be32(*cputype),
            cpusubtype: be32(0),
            offset: be32(*offset),
            size: be32(image.len() as u32),
            align: be32(12),
        }));
    }
    for (_, offset, image) in slices {
        pad_to(&mut buffer, *offset as usize);
        buffer.extend_from_slice(image);
    }
    buffer
}

// ---------------------------------------------------------------------------------------
// PE

pub struct PeSection<'a> {
    pub name: &'a str,
    pub rva: u32,
    pub raw_offset: u32,
    pub data: &'a [u8],
}

fn put16(buffer: &mut [u8], at: usize, v: u16) {
    buffer[at..at + 2].copy_from_slice(&v.to_le_bytes());
}
fn put32(buffer: &mut [u8], at: usize, v: u32) {
    buffer[at..at + 4].copy_from_slice(&v.to_le_bytes());
}

/// A PE32+ image with the given sections. Symbols live in a separate table.
pub fn pe_image(machine: u16, sections: &[PeSection]) -> Vec<u8> {
    const NT: usize = 0x80;
    const FILE_HEADER: usize = NT + 4;
    const OPTIONAL: usize = FILE_HEADER + 20;
    const OPTIONAL_SIZE: usize = 112 + 16 * 8;
    const SECTIONS: usize = OPTIONAL + OPTIONAL_SIZE;

    let headers_end = SECTIONS + 40 * sections.len();
    let mut buffer = vec![0u8; headers_end];

    // DOS header.
    buffer[0..2].copy_from_slice(b"MZ");
    put32(&mut buffer, 0x3c, NT as u32);

    buffer[NT..NT + 4].copy_from_slice(b"PE\0\0");
    put16(&mut buffer, FILE_HEADER, machine);
    put16(&mut buffer, FILE_HEADER + 2, sections.len() as u16);
    put16(&mut buffer, FILE_HEADER + 16, OPTIONAL_SIZE as u16);
    put16(&mut buffer, FILE_HEADER + 18, 0x22); // executable, large address aware

    put16(&mut buffer, OPTIONAL, 0x20b);
    put32(&mut buffer, OPTIONAL + 32, 0x1000); // section alignment
    put32(&mut buffer, OPTIONAL + 36, 0x200); // file alignment
    let image_size = sections
        .iter()
        .map(|s| s.rva + s.data.len() as u32)
        .max()
        .unwrap_or(0x1000);
    put32(&mut buffer, OPTIONAL + 56, image_size.next_multiple_of(0x1000));
    put32(&mut buffer, OPTIONAL + 60, headers_end as u32);
    put32(&mut buffer, OPTIONAL + 108, 16);

    for (i, section) in sections.iter().enumerate() {
        let at = SECTIONS + 40 * i;
        buffer[at..at + section.name.len()].copy_from_slice(section.name.as_bytes());
        put32(&mut buffer, at + 8, section.data.len() as u32);
        put32(&mut buffer, at + 12, section.rva);
        put32(&mut buffer, at + 16, section.data.len() as u32);
        put32(&mut buffer, at + 20, section.raw_offset);
        put32(&mut buffer, at + 36, 0x6000_0020); // code, execute, read
    }

    for section in sections {
        pad_to(&mut buffer, section.raw_offset as usize);
        buffer.extend_from_slice(section.data);
    }
    buffer
}

// ---------------------------------------------------------------------------------------
// PDB

pub struct PdbProcedure<'a> {
    pub name: &'a str,
    /// `S_GPROC32` when set, `S_LPROC32` otherwise.
    pub global: bool,
    /// 1-based section number.
    pub section: u16,
    /// Offset from the start of the section.
    pub offset: u32,
    pub len: u32,
}

const MSF_MAGIC: &[u8; 32] = b"Microsoft C/C++ MSF 7.00\r\n\x1a\x44\x53\x00\x00\x00";
const PDB_PAGE: usize = 0x1000;

fn push16(buffer: &mut Vec<u8>, v: u16) {
    buffer.extend_from_slice(&v.to_le_bytes());
}
fn push32(buffer: &mut Vec<u8>, v: u32) {
    buffer.extend_from_slice(&v.to_le_bytes());
}

/// CodeView symbol substream of one module: C13 signature, then one record per procedure.
fn module_symbols(procedures: &[PdbProcedure]) -> Vec<u8> {
    let mut stream = Vec::new();
    push32(&mut stream, 4);
    for procedure in procedures {
        let mut record = Vec::new();
        push16(&mut record, if procedure.global { 0x1110 } else { 0x110f });
        // parent, end, next
        for _ in 0..3 {
            push32(&mut record, 0);
        }
        push32(&mut record, procedure.len);
        push32(&mut record, 0); // debug start
        push32(&mut record, procedure.len); // debug end
        push32(&mut record, 0); // type index
        push32(&mut record, procedure.offset);
        push16(&mut record, procedure.section);
        record.push(0); // flags
        record.extend_from_slice(procedure.name.as_bytes());
        record.push(0);
        while (record.len() + 2) % 4 != 0 {
            record.push(0);
        }
        push16(&mut stream, record.len() as u16);
        stream.extend_from_slice(&record);
    }
    stream
}

/// DBI stream with one module whose symbols live in MSF stream `module_stream`.
fn dbi_stream(module_stream: u16, symbols_size: u32) -> Vec<u8> {
    let mut modules = Vec::new();
    push32(&mut modules, 0); // opened
    modules.extend_from_slice(&[0; 28]); // section contribution
    push16(&mut modules, 0); // flags
    push16(&mut modules, module_stream);
    push32(&mut modules, symbols_size);
    push32(&mut modules, 0); // C11 lines
    push32(&mut modules, 0); // C13 lines
    push16(&mut modules, 0); // source files
    push16(&mut modules, 0);
    push32(&mut modules, 0); // filename offsets
    push32(&mut modules, 0); // source name
    push32(&mut modules, 0); // PDB name
    modules.extend_from_slice(b"game.obj\0game.obj\0");
    align(&mut modules, 4);

    let mut stream = Vec::new();
    push32(&mut stream, u32::MAX); // new-style header
    push32(&mut stream, 19990903); // V70
    push32(&mut stream, 1); // age
    push16(&mut stream, 0xffff); // global symbols
    push16(&mut stream, 0);
    push16(&mut stream, 0xffff); // public symbols
    push16(&mut stream, 0);
    push16(&mut stream, 0xffff); // symbol records
    push16(&mut stream, 0);
    push32(&mut stream, modules.len() as u32);
    // section contributions, section map, file info, type server map, MFC index,
    // optional debug header, EC substream
    for _ in 0..7 {
        push32(&mut stream, 0);
    }
    push16(&mut stream, 0); // flags
    push16(&mut stream, 0x8664); // machine
    push32(&mut stream, 0);
    stream.extend_from_slice(&modules);
    stream
}

/// A multi-stream file (MSF 7.00) holding a DBI stream and one module stream.
///
/// Page layout: 0 superblock, 1-2 free page maps, 3 directory page list, 4 directory,
/// 5 DBI (stream 3), 6 module symbols (stream 4).
pub fn pdb_image(procedures: &[PdbProcedure]) -> Vec<u8> {
    let symbols = module_symbols(procedures);
    let dbi = dbi_stream(4, symbols.len() as u32);
    let streams: [(&[u8], u32); 5] = [(&[], 0), (&[], 0), (&[], 0), (&dbi, 5), (&symbols, 6)];

    let mut directory = Vec::new();
    push32(&mut directory, streams.len() as u32);
    for (data, _) in &streams {
        push32(&mut directory, data.len() as u32);
    }
    for (data, page) in &streams {
        if !data.is_empty() {
            push32(&mut directory, *page);
        }
    }

    let mut superblock = MSF_MAGIC.to_vec();
    push32(&mut superblock, PDB_PAGE as u32);
    push32(&mut superblock, 1); // free page map
    push32(&mut superblock, 7); // pages
    push32(&mut superblock, directory.len() as u32);
    push32(&mut superblock, 0);
    push32(&mut superblock, 3); // page holding the directory page list

    let mut buffer = vec![0u8; 7 * PDB_PAGE];
    let mut place = |page: usize, data: &[u8]| {
        assert!(data.len() <= PDB_PAGE, "PDB fixture stream spans pages");
        buffer[page * PDB_PAGE..page * PDB_PAGE + data.len()].copy_from_slice(data);
    };
    place(0, &superblock);
    place(3, &4u32.to_le_bytes());
    place(4, &directory);
    for (data, page) in &streams {
        place(*page as usize, data);
    }
    buffer
}
