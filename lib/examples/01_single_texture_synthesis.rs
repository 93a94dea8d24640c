fn main() -> Result<(), graphcut_synthesis::Error> {
    // build a small procedural sample so the example runs without any assets
    let mut sample = graphcut_synthesis::image::RgbImage::new(24, 24);
    for (x, y, p) in sample.enumerate_pixels_mut() {
        let v = (((x / 4) + (y / 4)) % 2 * 200 + 30) as u8;
        *p = graphcut_synthesis::image::Rgb([v, v / 2, 255 - v]);
    }

    // create a new session
    let session = graphcut_synthesis::Session::builder()
        .load_texture(graphcut_synthesis::image::DynamicImage::ImageRgb8(sample))
        .output_size(graphcut_synthesis::Dims::square(128))
        .seed(10)
        .build()?;

    // generate an image
    let generated = session.run(None)?;

    // save the image to the disk
    generated.save("out/01.png")
}
