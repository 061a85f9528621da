use honggfuzz::fuzz;
use image::DynamicImage;

// Arbitrary bytes through the decoder and the comparator must never panic:
// undecodable input is an ImageRead error, decodable input is a diff.
fn main() {
    loop {
        fuzz!(|data: &[u8]| {
            if let Ok(img) = image::load_from_memory(data) {
                let reference = DynamicImage::new_rgb8(4, 4);
                let _ = vergence::compare(&reference, &img);
                let _ = vergence::compare(&img, &reference);
            }
        });
    }
}
