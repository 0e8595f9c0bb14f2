// SPDX-License-Identifier: MIT OR Apache-2.0
//! Compiled-in page content.

use showcase_playback::{
    AsmLine, CatalogEvent, CounterFormat, CounterSpec, DemoScript, EventCategory, FeedCatalog,
    Millis, SampleBinary, SourceLine,
};

/// Binaries offered by the demo picker
pub fn sample_binaries() -> Vec<SampleBinary> {
    vec![
        SampleBinary::new("libcrypto.so.3", "x86_64", "4.2 MB", 2847),
        SampleBinary::new("ntoskrnl.exe", "amd64", "11.8 MB", 18432),
        SampleBinary::new("firmware.bin", "ARM32", "892 KB", 341),
    ]
}

/// The `compute_sum` listing and its decompiled source
pub fn demo_script() -> DemoScript {
    let disassembly = [
        ("00401000", "55 89 e5 83 ec 18", "push   ebp; mov ebp,esp; sub esp,0x18"),
        ("00401003", "c7 45 f4 00 00 00 00", "mov    DWORD PTR [ebp-0xc],0x0"),
        ("0040100a", "c7 45 f0 01 00 00 00", "mov    DWORD PTR [ebp-0x10],0x1"),
        ("00401011", "83 7d f0 0a", "cmp    DWORD PTR [ebp-0x10],0xa"),
        ("00401015", "7f 12", "jg     0x401029"),
        ("00401017", "8b 45 f0", "mov    eax,DWORD PTR [ebp-0x10]"),
        ("0040101a", "01 45 f4", "add    DWORD PTR [ebp-0xc],eax"),
        ("0040101d", "83 45 f0 01", "add    DWORD PTR [ebp-0x10],0x1"),
        ("00401021", "eb ee", "jmp    0x401011"),
        ("00401023", "8b 45 f4", "mov    eax,DWORD PTR [ebp-0xc]"),
        ("00401026", "c9 c3", "leave; ret"),
    ];
    let decompiled: [(&str, u8, Millis); 11] = [
        ("int compute_sum(void) {", 0, 800),
        ("int sum = 0;", 1, 1200),
        ("int i = 1;", 1, 1500),
        ("", 0, 1700),
        ("while (i <= 10) {", 1, 2000),
        ("sum += i;", 2, 2400),
        ("i++;", 2, 2700),
        ("}", 1, 3000),
        ("", 0, 3200),
        ("return sum;", 1, 3500),
        ("}", 0, 3800),
    ];

    DemoScript {
        disassembly: disassembly
            .iter()
            .map(|(addr, bytes, asm)| AsmLine::new(*addr, *bytes, *asm))
            .collect(),
        decompiled: decompiled
            .iter()
            .map(|(text, indent, delay)| SourceLine::new(*text, *indent, *delay))
            .collect(),
    }
}

/// Events the live feed draws from
pub fn feed_catalog() -> FeedCatalog {
    use EventCategory::*;
    let events = [
        (Decompile, "x86_64 ELF — 2,847 functions"),
        (Decompile, "ARM32 firmware — 341 functions"),
        (Analyze, "PE amd64 — symbol resolution"),
        (Decompile, "MIPS32 router binary — 1,203 functions"),
        (Xref, "Cross-reference scan — 14,891 refs mapped"),
        (Decompile, "RISC-V ELF — 892 functions"),
        (Cfg, "Control flow graph — 3,201 nodes"),
        (Analyze, "Mach-O arm64 — dynamic linking"),
        (Decompile, "x86 PE — 5,443 functions"),
        (Patch, "Binary patch applied — 3 relocations"),
    ];
    FeedCatalog::new(
        events
            .iter()
            .map(|(category, detail)| CatalogEvent::new(*category, *detail))
            .collect(),
    )
}

/// A labelled stat tile
#[derive(Debug, Clone)]
pub struct StatTile {
    /// Caption under the number
    pub label: &'static str,
    /// Counter driving the number
    pub spec: CounterSpec,
}

/// The stats grid, with counters on the given timing
pub fn stat_tiles(duration_ms: Millis, tick_ms: Millis) -> Vec<StatTile> {
    let tile = |label, spec: CounterSpec| StatTile {
        label,
        spec: spec.with_timing(duration_ms, tick_ms),
    };
    vec![
        tile("Binaries Analyzed", CounterSpec::new(847_291.0, CounterFormat::Grouped)),
        tile(
            "Functions Decompiled",
            CounterSpec::new(12.4, CounterFormat::OneDecimal).with_suffix("M"),
        ),
        tile(
            "Avg. Decompilation",
            CounterSpec::new(1.3, CounterFormat::OneDecimal).with_suffix("s"),
        ),
        tile("Supported Architectures", CounterSpec::new(16.0, CounterFormat::Integer)),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_script_shape() {
        let script = demo_script();
        assert_eq!(script.disassembly.len(), 11);
        assert_eq!(script.decompiled.len(), 11);
        assert_eq!(script.decompiled.last().map(|l| l.delay_ms), Some(3800));
    }

    #[test]
    fn test_catalogs() {
        assert_eq!(sample_binaries().len(), 3);
        assert_eq!(feed_catalog().events.len(), 10);
        let tiles = stat_tiles(2000, 16);
        assert_eq!(tiles.len(), 4);
        assert!(tiles.iter().all(|t| t.spec.duration_ms == 2000));
    }
}
