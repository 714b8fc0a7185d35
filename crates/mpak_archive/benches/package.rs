use divan::AllocProfiler;

#[global_allocator]
static ALLOC: AllocProfiler = AllocProfiler::system();

fn main() {
    divan::main();
}

/// Build an archive holding `width` folders of `width` files each, all 64 bytes long
fn generate(width: usize) -> Vec<u8> {
    use mpak_archive::{write::PackageWriterOptions, PackageWriter};

    let mut writer = PackageWriter::new("bench", PackageWriterOptions::default());
    let contents = [0xA5; 64];
    for folder in 0..width {
        writer.start_folder(format!("folder_{folder:04}")).unwrap();
        for file in 0..width {
            writer.add_file(format!("file_{file:04}.bin"), &contents).unwrap();
        }
        writer.finish_folder().unwrap();
    }

    writer.finish().unwrap().to_bytes().unwrap()
}

pub mod read {
    use divan::Bencher;
    use mpak_archive::Package;

    #[divan::bench(args = [8, 64])]
    fn parse(bencher: Bencher, width: usize) {
        bencher
            .with_inputs(|| super::generate(width))
            .bench_refs(|data| {
                divan::black_box(Package::parse(data).unwrap());
            });
    }

    #[divan::bench(args = [8, 64])]
    fn parse_owned(bencher: Bencher, width: usize) {
        bencher
            .with_inputs(|| super::generate(width))
            .bench_refs(|data| {
                divan::black_box(Package::parse_owned(data).unwrap());
            });
    }

    #[divan::bench]
    fn read_last_file(bencher: Bencher) {
        let data = super::generate(64);
        let package = Package::parse(&data).unwrap();

        bencher.bench_local(|| {
            divan::black_box(package.read("folder_0063/file_0063.bin").unwrap());
        });
    }
}

pub mod write {
    use divan::Bencher;
    use mpak_archive::Package;

    #[divan::bench(args = [8, 64])]
    fn encode(bencher: Bencher, width: usize) {
        let data = super::generate(width);
        let package = Package::parse_owned(&data).unwrap();

        bencher.bench_local(|| {
            divan::black_box(package.to_bytes().unwrap());
        });
    }
}
