#![allow(dead_code)]

#[path = "../../src/apk/fixtures.rs"]
pub mod fixtures;

use fixtures::{ManifestBuilder, ResourceTableBuilder};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use zip::write::SimpleFileOptions;

pub const REFERENCE_CHARACTERS: &str = "Name,Type\nString,String\nShotgunGirl,Hero\nGunslinger,Hero\nBossRobot,Boss\n";
pub const REFERENCE_SKINS: &str = "Name\nString\nShotgunGirlDefault\nGunslingerDefault\nBanditShelly\n";

/// Unpacked reference build with two playable characters and three skins.
pub fn write_reference(root: &Path) -> PathBuf {
    let reference = root.join("latest_brawl_stars_apk");
    let logic = reference.join("assets/csv_logic");
    fs::create_dir_all(&logic).unwrap();
    fs::write(logic.join("characters.csv"), REFERENCE_CHARACTERS).unwrap();
    fs::write(logic.join("skin_confs.csv"), REFERENCE_SKINS).unwrap();
    reference
}

/// Contents of a synthetic package.
#[derive(Default)]
pub struct PackageSpec<'a> {
    pub package: Option<&'a str>,
    pub app_name: Option<&'a str>,
    pub version: Option<&'a str>,
    pub offline: bool,
    pub characters: Option<&'a str>,
    pub skins: Option<&'a str>,
}

pub fn write_package(path: &Path, spec: &PackageSpec) {
    let mut writer = zip::ZipWriter::new(File::create(path).unwrap());
    let options = SimpleFileOptions::default();

    if let Some(package) = spec.package {
        let mut manifest = ManifestBuilder::new().string_attr(false, "package", package);
        if let Some(version) = spec.version {
            manifest = manifest.string_attr(true, "versionName", version);
        }
        writer.start_file("AndroidManifest.xml", options).unwrap();
        writer.write_all(&manifest.build()).unwrap();

        if let Some(app_name) = spec.app_name {
            let table = ResourceTableBuilder::new(package).string("app_name", app_name);
            writer.start_file("resources.arsc", options).unwrap();
            writer.write_all(&table.build()).unwrap();
        }
    }

    if spec.offline {
        writer.start_file("assets/server/index.html", options).unwrap();
        writer.write_all(b"<html></html>").unwrap();
    }
    if let Some(characters) = spec.characters {
        writer.start_file("assets/csv_logic/characters.csv", options).unwrap();
        writer.write_all(characters.as_bytes()).unwrap();
    }
    if let Some(skins) = spec.skins {
        writer.start_file("assets/csv_logic/skin_confs.csv", options).unwrap();
        writer.write_all(skins.as_bytes()).unwrap();
    }

    writer.finish().unwrap();
}

/// Parses the output table into rows of fields, header included.
pub fn read_table(path: &Path) -> Vec<Vec<String>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .from_path(path)
        .unwrap();
    reader
        .records()
        .map(|r| r.unwrap().iter().map(str::to_string).collect())
        .collect()
}
