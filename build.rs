fn main() {
    #[cfg(windows)]
    {
        use std::env;
        use std::path::PathBuf;

        let manifest_dir = env::var("CARGO_MANIFEST_DIR").unwrap();
        let ico_path = PathBuf::from(&manifest_dir)
            .join("resources")
            .join("wrapper-icon.ico");
        println!("cargo:rerun-if-changed={}", ico_path.display());

        // 아이콘이 없으면 기본 아이콘으로 빌드
        if ico_path.exists() {
            let mut res = winres::WindowsResource::new();
            res.set_icon(ico_path.to_str().unwrap());

            if let Err(e) = res.compile() {
                println!("cargo:warning=Failed to compile resources: {}", e);
            }
        } else {
            println!(
                "cargo:warning=Icon file not found. Place wrapper-icon.ico in the resources directory to embed it"
            );
        }
    }
}
