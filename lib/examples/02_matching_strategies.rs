use graphcut_synthesis as gs;

fn main() -> Result<(), gs::Error> {
    let mut sample = gs::image::RgbImage::new(32, 32);
    for (x, y, p) in sample.enumerate_pixels_mut() {
        let v = ((x * 23 + y * 51) % 256) as u8;
        *p = gs::image::Rgb([v, 255 - v, (x * 5) as u8]);
    }

    // the same seed with each offset search strategy
    let strategies = [
        ("fft", gs::Matching::EntireFft),
        ("random", gs::Matching::EntireRandom { times: 100 }),
        ("sub_patch", gs::Matching::SubPatch { times: 100 }),
    ];

    for &(name, matching) in &strategies {
        let session = gs::Session::builder()
            .load_texture(gs::image::DynamicImage::ImageRgb8(sample.clone()))
            .output_size(gs::Dims::square(96))
            .seed(7)
            .iterations(40)
            .matching(matching)
            .build()?;

        session.run(None)?.save(format!("out/02_{}.png", name))?;
    }

    Ok(())
}
