use molten_api::{MoltenMapType, MoltenResource};
use std::io::{Cursor, Read, Seek, SeekFrom, Write};

/// A CPU-side view of one mapped subresource, returned by `GraphicsQueue::map_resource`.
///
/// The stream has the exact size of the subresource and can't grow. Writes land in the device's
/// copy only when the stream is handed back to `GraphicsQueue::unmap_resource`.
pub struct ResourceStream {
    resource: MoltenResource,
    subresource: u32,
    map_type: MoltenMapType,
    cursor: Cursor<Vec<u8>>,
    unmapped: bool,
}

impl ResourceStream {
    pub(crate) fn new(
        resource: MoltenResource,
        subresource: u32,
        map_type: MoltenMapType,
        data: Vec<u8>,
        offset: u64,
    ) -> Self {
        let mut cursor = Cursor::new(data);
        cursor.set_position(offset);
        ResourceStream {
            resource,
            subresource,
            map_type,
            cursor,
            unmapped: false,
        }
    }

    pub fn resource(&self) -> &MoltenResource {
        &self.resource
    }

    pub fn subresource(&self) -> u32 {
        self.subresource
    }

    pub fn map_type(&self) -> MoltenMapType {
        self.map_type
    }

    pub fn position(&self) -> u64 {
        self.cursor.position()
    }

    /// Size of the mapped subresource in bytes
    pub fn len(&self) -> u64 {
        self.cursor.get_ref().len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.cursor.get_ref().is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        self.cursor.get_ref()
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        self.cursor.get_mut()
    }

    // Consumed by unmap
    pub(crate) fn finish(mut self) -> (MoltenResource, u32, MoltenMapType, Vec<u8>) {
        self.unmapped = true;
        let data = std::mem::take(self.cursor.get_mut());
        (self.resource.clone(), self.subresource, self.map_type, data)
    }
}

impl Read for ResourceStream {
    fn read(
        &mut self,
        buf: &mut [u8],
    ) -> std::io::Result<usize> {
        self.cursor.read(buf)
    }
}

impl Write for ResourceStream {
    fn write(
        &mut self,
        buf: &[u8],
    ) -> std::io::Result<usize> {
        let remaining = self.len().saturating_sub(self.position()) as usize;
        let len = buf.len().min(remaining);
        self.cursor.write(&buf[..len])
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl Seek for ResourceStream {
    fn seek(
        &mut self,
        pos: SeekFrom,
    ) -> std::io::Result<u64> {
        self.cursor.seek(pos)
    }
}

impl Drop for ResourceStream {
    fn drop(&mut self) {
        if !self.unmapped {
            log::warn!(
                "Resource {:?} subresource {} was mapped but never unmapped",
                self.resource.id(),
                self.subresource
            );
        }
    }
}

impl std::fmt::Debug for ResourceStream {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("ResourceStream")
            .field("resource", &self.resource.id())
            .field("subresource", &self.subresource)
            .field("map_type", &self.map_type)
            .field("position", &self.position())
            .field("len", &self.len())
            .finish()
    }
}
