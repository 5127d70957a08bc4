// NSO load planner
// Prints the layout a title would get when loaded

use log::LevelFilter;
use nsoldr::{config::*, extents::*, logger::*, *};
use std::{env, fs, io, path::Path, process};

fn usage() -> ! {
    let mut args = env::args_os();
    let arg = args.next().unwrap_or_default();
    let path = Path::new(&arg);
    let lpc = path
        .file_name()
        .and_then(|v| v.to_str())
        .unwrap_or("nsoldr");
    eprintln!(
        "{} [-v] [-c CONFIG] [-s SLIDE] TITLE_ID [ADDSPACE_TYPE [ARGS_SIZE]]",
        lpc
    );
    process::exit(1);
}

fn parse_number(arg: &str) -> Option<u64> {
    match arg.strip_prefix("0x").or_else(|| arg.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16).ok(),
        None => arg.parse().ok(),
    }
}

fn parse_u32(arg: &str) -> Option<u32> {
    parse_number(arg).and_then(|v| u32::try_from(v).ok())
}

fn main() {
    let mut args = env::args();
    let _ = args.next();

    let mut is_verbose = false;
    let mut path_config = None;
    let mut slide = None;
    let mut positional = Vec::new();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-v" => is_verbose = true,
            "-c" => path_config = Some(args.next().unwrap_or_else(|| usage())),
            "-s" => {
                slide = Some(
                    args.next()
                        .as_deref()
                        .and_then(parse_number)
                        .unwrap_or_else(|| usage()),
                )
            }
            _ if arg.starts_with('-') => {
                eprintln!("unknown option: {}", arg);
                usage();
            }
            _ => positional.push(arg),
        }
    }

    let mut positional = positional.iter();
    let title_id = match positional.next().map(|v| parse_number(v)) {
        Some(Some(v)) => TitleId(v),
        _ => usage(),
    };
    let addspace_type = match positional.next().map(|v| parse_u32(v)) {
        Some(Some(v)) => AddressSpaceType::from_raw(v),
        Some(None) => usage(),
        None => AddressSpaceType::empty(),
    };
    let args_size = match positional.next().map(|v| parse_u32(v)) {
        Some(Some(v)) => v,
        Some(None) => usage(),
        None => 0,
    };

    let level = if is_verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    if let Err(err) = StderrLogger::init(level) {
        eprintln!("cannot install logger: {}", err);
    }

    // Load CONFIG
    let json = match read_config(path_config.as_deref()) {
        Ok(v) => v,
        Err(err) => {
            eprintln!("Error: {}", err);
            process::exit(1);
        }
    };
    let settings = match json.as_deref().map(LoaderSettings::load) {
        Some(Ok(v)) => v,
        Some(Err(err)) => {
            eprintln!("Error: {}", err);
            process::exit(1);
        }
        None => LoaderSettings::default(),
    };

    let source = settings.image_source();
    let kernel = settings.kernel_version();
    let mut slide_source = settings.slide_source(slide);
    let request = LoadRequest {
        title_id,
        addspace_type,
        args_size,
    };

    let plan = match plan_load(&source, &kernel, slide_source.as_mut(), &request) {
        Ok(v) => v,
        Err(err) => {
            eprintln!("Error: {} ({:#x})", err, err.result_code());
            process::exit(1);
        }
    };

    let extents = &plan.extents;
    println!("TITLE {} (kernel {})", title_id, kernel);
    for (slot, header) in plan.headers.present() {
        println!(
            " {:<8} {:012x} {:08x} text {:08x} ro {:08x} rw {:08x}",
            slot.file_name(),
            extents.address_of(slot),
            extents.size_of(slot),
            header.text().dst_offset,
            header.rodata().dst_offset,
            header.data().dst_offset,
        );
    }
    println!(
        " - BASE: {:012x} TOTAL: {:x}",
        extents.base_address, extents.total_size
    );
    if let Some(args) = extents.args {
        println!(" - ARGS: {:012x} SIZE: {:x}", args.address, args.size);
    }
    println!(
        " - ADDRESS SPACE: {:012x}-{:012x}",
        extents.address_space.start,
        extents.address_space.end()
    );
}

fn read_config(path: Option<&str>) -> Result<Option<String>, SettingsError> {
    let (path, is_explicit) = match path {
        Some(v) => (v, true),
        None => (LoaderSettings::DEFAULT_CONFIG_PATH, false),
    };
    match fs::read_to_string(path) {
        Ok(json) => Ok(Some(json)),
        Err(err) if err.kind() == io::ErrorKind::NotFound && !is_explicit => Ok(None),
        Err(err) => Err(SettingsError::Io(err)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers() {
        assert_eq!(parse_number("0x0100000000001000"), Some(0x0100_0000_0000_1000));
        assert_eq!(parse_number("42"), Some(42));
        assert_eq!(parse_number("0xZZ"), None);

        assert_eq!(parse_u32("0x20"), Some(0x20));
        assert_eq!(parse_u32("0xFFFFFFFF"), Some(u32::MAX));
        // values wider than 32 bits are rejected, not truncated
        assert_eq!(parse_u32("0x100000002"), None);
        assert_eq!(parse_u32("0x100000000"), None);
        assert_eq!(parse_u32("4294967296"), None);
    }
}
