//! Shared test helpers: stub engines and pkeyconfig fixtures.

#![allow(dead_code)]

use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use keycheck_core::{PidBuffers, PidGenRequest, ValidationEngine};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

pub const PKEY_NS: &str = "http://schemas.microsoft.com/DRM/PKEY/Configuration/2.0";

/// Field values an engine writes on success.
#[derive(Debug, Clone)]
pub struct DpidFields {
    pub key_pid: String,
    pub eid: String,
    pub aid: String,
    pub edi: String,
    pub sub: String,
    pub lit: String,
    pub lic: String,
}

impl DpidFields {
    pub fn office(aid: &str, edi: &str) -> Self {
        Self {
            key_pid: "02064-206-0002416-73432".to_string(),
            eid: "05426-00206-002-416734-03-1033-7601.0000-1782011".to_string(),
            aid: aid.to_string(),
            edi: edi.to_string(),
            sub: "Office14".to_string(),
            lit: "Volume:MAK".to_string(),
            lic: "Volume".to_string(),
        }
    }
}

/// Writes `s` as UTF-16LE at `offset`.
pub fn put_wide(buf: &mut [u8], offset: usize, s: &str) {
    for (i, unit) in s.encode_utf16().enumerate() {
        let at = offset + i * 2;
        buf[at..at + 2].copy_from_slice(&unit.to_le_bytes());
    }
}

/// Fills engine buffers the way PidGenX lays them out.
pub fn write_fields(buffers: &mut PidBuffers, fields: &DpidFields) {
    put_wide(&mut buffers.pid, 0, &fields.key_pid);
    put_wide(&mut buffers.dpid4, 8, &fields.eid);
    put_wide(&mut buffers.dpid4, 136, &fields.aid);
    put_wide(&mut buffers.dpid4, 280, &fields.edi);
    put_wide(&mut buffers.dpid4, 888, &fields.sub);
    put_wide(&mut buffers.dpid4, 1016, &fields.lit);
    put_wide(&mut buffers.dpid4, 1144, &fields.lic);
}

/// Engine that accepts the key only for the listed configuration paths.
#[derive(Default)]
pub struct ScriptedEngine {
    accept: HashMap<PathBuf, DpidFields>,
    calls: Mutex<Vec<PathBuf>>,
}

impl ScriptedEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn accept(mut self, config_path: impl Into<PathBuf>, fields: DpidFields) -> Self {
        self.accept.insert(config_path.into(), fields);
        self
    }

    pub fn calls(&self) -> Vec<PathBuf> {
        self.calls.lock().unwrap().clone()
    }
}

impl ValidationEngine for ScriptedEngine {
    fn pid_gen(&self, request: &PidGenRequest<'_>, buffers: &mut PidBuffers) -> i32 {
        assert_eq!(request.marketplace_id, "00000");
        assert_eq!(request.usage, 0);
        assert_eq!(buffers.pid[0], 0x32);
        assert_eq!(buffers.dpid[0], 0xA4);
        assert_eq!(&buffers.dpid4[..2], &[0xF8, 0x04]);

        self.calls
            .lock()
            .unwrap()
            .push(request.config_path.to_path_buf());
        match self.accept.get(request.config_path) {
            Some(fields) => {
                write_fields(buffers, fields);
                0
            }
            None => 0x8A02_0001_u32 as i32,
        }
    }
}

/// Engine that stages its output in one scratch area shared by all calls,
/// yielding between writes. Overlapping calls would mix their outputs.
pub struct SharedScratchEngine {
    scratch: Mutex<Vec<u8>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl SharedScratchEngine {
    pub fn new() -> Self {
        Self {
            scratch: Mutex::new(vec![0; 64]),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

impl ValidationEngine for SharedScratchEngine {
    fn pid_gen(&self, request: &PidGenRequest<'_>, buffers: &mut PidBuffers) -> i32 {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let staged: Vec<u8> = request
            .product_key
            .encode_utf16()
            .flat_map(u16::to_le_bytes)
            .collect();
        for (i, byte) in staged.iter().enumerate() {
            self.scratch.lock().unwrap()[i] = *byte;
            std::thread::yield_now();
        }
        let len = staged.len();
        let key_pid = {
            let scratch = self.scratch.lock().unwrap();
            let units: Vec<u16> = scratch[..len]
                .chunks_exact(2)
                .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
                .collect();
            String::from_utf16_lossy(&units)
        };

        let mut fields = DpidFields::office("abc", "Pro");
        fields.key_pid = key_pid;
        write_fields(buffers, &fields);

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        0
    }
}

/// Inner configuration document with `(ActConfigId, EditionId, ProductDescription)` nodes.
pub fn configuration_document(configs: &[(&str, &str, &str)]) -> String {
    let nodes: String = configs
        .iter()
        .map(|(aid, edi, prd)| {
            format!(
                "<Configuration><ActConfigId>{aid}</ActConfigId><RefGroupId>206</RefGroupId>\
                 <EditionId>{edi}</EditionId><ProductDescription>{prd}</ProductDescription>\
                 <ProductKeyType>Volume:MAK</ProductKeyType><IsRandomized>false</IsRandomized>\
                 </Configuration>"
            )
        })
        .collect();
    format!(
        r#"<?xml version="1.0" encoding="utf-8"?><ProductKeyConfiguration xmlns="{PKEY_NS}"><Configurations>{nodes}</Configurations><KeyRanges/><PublicKeys/></ProductKeyConfiguration>"#
    )
}

/// Outer license document wrapping `inner` in a base64 `tm:infoBin`.
pub fn license_document(inner: &str) -> String {
    let encoded = BASE64.encode(inner.as_bytes());
    // Wrapped like the real files, which break the base64 across lines.
    let wrapped: Vec<&str> = encoded
        .as_bytes()
        .chunks(76)
        .map(|c| std::str::from_utf8(c).unwrap())
        .collect();
    format!(
        r##"<?xml version="1.0" encoding="utf-8"?>
<rg:licenseGroup xmlns:rg="urn:mpeg:mpeg21:2003:01-REL-R-NS">
  <r:license xmlns:r="urn:mpeg:mpeg21:2003:01-REL-R-NS" xmlns:tm="http://www.microsoft.com/DRM/XrML2/TM/v2">
    <r:otherInfo>
      <tm:infoTables>
        <tm:infoList tag="#global">
          <tm:infoStr name="licenseType">msft:sl/PKEYCONFIG/SIGNED</tm:infoStr>
          <tm:infoBin name="pkeyConfigData">
{}
          </tm:infoBin>
        </tm:infoList>
      </tm:infoTables>
    </r:otherInfo>
  </r:license>
</rg:licenseGroup>"##,
        wrapped.join("\n")
    )
}

/// Writes a pkeyconfig file into `dir` and returns its path.
pub fn write_pkeyconfig(dir: &Path, name: &str, configs: &[(&str, &str, &str)]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, license_document(&configuration_document(configs))).unwrap();
    path
}

/// Writes a catalog listing `names` and returns its path.
pub fn write_catalog(dir: &Path, names: &[&str]) -> PathBuf {
    let entries: String = names
        .iter()
        .map(|name| format!(r#"  <configType configPath="{name}" />"#))
        .collect::<Vec<_>>()
        .join("\n");
    let path = dir.join("PkeyData.xml");
    std::fs::write(
        &path,
        format!("<?xml version=\"1.0\" encoding=\"utf-8\"?>\n<PkeyData>\n{entries}\n</PkeyData>\n"),
    )
    .unwrap();
    path
}
