/// Build script for Windows metadata and icon resources

fn main() {
    #[cfg(windows)]
    {
        let mut res = winres::WindowsResource::new();

        res.set_version_info(winres::VersionInfo::PRODUCTVERSION, 0x0000_0001_0000_0000); // 0.1.0.0
        res.set_version_info(winres::VersionInfo::FILEVERSION, 0x0000_0001_0000_0000);

        res.set("ProductName", "mddrop");
        res.set("ProductVersion", env!("CARGO_PKG_VERSION"));
        res.set("FileDescription", "Drag-and-drop Markdown viewer");
        res.set("FileVersion", env!("CARGO_PKG_VERSION"));
        res.set("OriginalFilename", "mddrop.exe");
        res.set("InternalName", "mddrop");

        if std::path::Path::new("icon.ico").exists() {
            res.set_icon("icon.ico");
        }

        // A missing resource compiler must not fail the build.
        match res.compile() {
            Ok(_) => println!("cargo:info=Windows resources compiled successfully"),
            Err(e) => println!("cargo:warning=Failed to compile Windows resources: {}", e),
        }
    }

    #[cfg(not(windows))]
    {
        println!("cargo:info=Skipping Windows resources on non-Windows platform");
    }
}
