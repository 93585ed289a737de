//! Binary navigation mesh files
//!
//! Layout, all little-endian:
//!
//! ```text
//! u32 magic ('NAVM')   u32 version
//! u16 type count       { u16 name length, name bytes (utf-8), i32 precedence }
//! u32 polygon count    u32 next id
//! per polygon:
//!     u32 id  u16 type  i16 tag  u16 point count
//!     point count * { f32 x, f32 y, f32 z }
//!     point count * { u32 target polygon record (NULL_LINK if none), u16 target edge }
//! ```
//!
//! Loading parses and validates the whole file into a fresh mesh before it
//! replaces the receiving one.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use nav_common::{polygon_area_2d, Error, Result, Vec3};

use crate::nav_mesh::NavMesh;
use crate::nav_poly::PolyId;
use crate::types::{TypeIndex, MAX_TYPES};

/// Magic number for navigation mesh files ('NAVM')
pub const NAVMESH_MAGIC: u32 = u32::from_le_bytes(*b"NAVM");

/// Current navigation mesh file version
pub const NAVMESH_VERSION: u32 = 1;

/// Null link value
const NULL_LINK: u32 = 0xffff_ffff;

#[derive(Debug)]
struct PolyRecord {
    id: u32,
    type_index: TypeIndex,
    tag: i16,
    points: Vec<Vec3>,
    links: Vec<Option<(usize, usize)>>,
}

impl NavMesh {
    /// Writes the mesh to a writer
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_u32::<LittleEndian>(NAVMESH_MAGIC)?;
        writer.write_u32::<LittleEndian>(NAVMESH_VERSION)?;

        writer.write_u16::<LittleEndian>(self.types.len() as u16)?;
        for (_, name, precedence) in self.types.iter() {
            let bytes = name.as_bytes();
            writer.write_u16::<LittleEndian>(bytes.len() as u16)?;
            writer.write_all(bytes)?;
            writer.write_i32::<LittleEndian>(precedence)?;
        }

        writer.write_u32::<LittleEndian>(self.polys.len() as u32)?;
        writer.write_u32::<LittleEndian>(self.next_id)?;

        // Links are stored as record indices, records are in id order
        let index_of: HashMap<PolyId, u32> = self
            .polys
            .keys()
            .enumerate()
            .map(|(i, id)| (*id, i as u32))
            .collect();
        for poly in self.polys.values() {
            writer.write_u32::<LittleEndian>(poly.id.0)?;
            writer.write_u16::<LittleEndian>(poly.type_index)?;
            writer.write_i16::<LittleEndian>(poly.tag)?;
            writer.write_u16::<LittleEndian>(poly.size() as u16)?;
            for p in &poly.points {
                writer.write_f32::<LittleEndian>(p.x)?;
                writer.write_f32::<LittleEndian>(p.y)?;
                writer.write_f32::<LittleEndian>(p.z)?;
            }
            for edge in 0..poly.size() {
                match self.linked(poly.id, edge) {
                    Some((other, other_edge)) => {
                        writer.write_u32::<LittleEndian>(index_of[&other])?;
                        writer.write_u16::<LittleEndian>(other_edge as u16)?;
                    }
                    None => {
                        writer.write_u32::<LittleEndian>(NULL_LINK)?;
                        writer.write_u16::<LittleEndian>(0)?;
                    }
                }
            }
        }
        Ok(())
    }

    /// Replaces the mesh contents with data read from a reader.
    ///
    /// Type names in the file are mapped onto this mesh's registry, adding any
    /// that are missing. On error the mesh is left untouched.
    pub fn read_from<R: Read>(&mut self, reader: &mut R) -> Result<()> {
        let magic = reader.read_u32::<LittleEndian>()?;
        if magic != NAVMESH_MAGIC {
            return Err(Error::WrongMagic(magic));
        }
        let version = reader.read_u32::<LittleEndian>()?;
        if version != NAVMESH_VERSION {
            return Err(Error::WrongVersion(version));
        }

        let mut loaded = NavMesh::from_parts(self.config.clone(), self.types.clone());

        let type_count = reader.read_u16::<LittleEndian>()? as usize;
        if type_count > MAX_TYPES {
            return Err(Error::TooManyTypes(type_count));
        }
        let mut type_map = Vec::with_capacity(type_count);
        for _ in 0..type_count {
            let len = reader.read_u16::<LittleEndian>()? as usize;
            let mut bytes = vec![0u8; len];
            reader.read_exact(&mut bytes)?;
            let name = String::from_utf8(bytes)
                .map_err(|_| Error::DataCorrupted("type name is not utf-8".to_string()))?;
            let precedence = reader.read_i32::<LittleEndian>()?;
            let index = match loaded.types.find(&name) {
                Some(index) => index,
                None => loaded.types.set_type(&name, precedence)?,
            };
            type_map.push(index);
        }

        let poly_count = reader.read_u32::<LittleEndian>()? as usize;
        let next_id = reader.read_u32::<LittleEndian>()?;
        let records = (0..poly_count)
            .map(|_| read_record(&mut *reader, poly_count, &type_map))
            .collect::<Result<Vec<_>>>()?;

        validate_records(&records, next_id)?;

        // Records are validated, build the mesh
        for record in &records {
            loaded.insert_polygon_with_id(
                PolyId(record.id),
                record.points.clone(),
                record.type_index,
                record.tag,
            );
        }
        loaded.next_id = next_id;

        for (i, record) in records.iter().enumerate() {
            for (edge, link) in record.links.iter().enumerate() {
                if let Some((j, other_edge)) = *link {
                    // Each link appears twice, create it from the lower end
                    if (i, edge) < (j, other_edge) {
                        loaded.create_link(PolyId(record.id), edge, PolyId(records[j].id), other_edge);
                    }
                }
            }
        }

        log::info!(
            "Loaded navmesh with {} polygons and {} links",
            loaded.len(),
            loaded.link_count()
        );
        *self = loaded;
        Ok(())
    }

    /// Saves the mesh to a file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path.as_ref())?);
        self.write_to(&mut writer)?;
        writer.flush()?;
        log::info!(
            "Saved navmesh with {} polygons to {}",
            self.len(),
            path.as_ref().display()
        );
        Ok(())
    }

    /// Replaces the mesh contents with a file. On error the mesh is left untouched.
    pub fn load_from_file<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let mut reader = BufReader::new(File::open(path)?);
        self.read_from(&mut reader)
    }
}

fn read_record<R: Read>(reader: &mut R, poly_count: usize, type_map: &[TypeIndex]) -> Result<PolyRecord> {
    let id = reader.read_u32::<LittleEndian>()?;
    let file_type = reader.read_u16::<LittleEndian>()? as usize;
    let type_index = *type_map.get(file_type).ok_or_else(|| {
        Error::DataCorrupted(format!("polygon {id} has unknown type {file_type}"))
    })?;
    let tag = reader.read_i16::<LittleEndian>()?;
    let size = reader.read_u16::<LittleEndian>()? as usize;
    if size < 3 {
        return Err(Error::DataCorrupted(format!(
            "polygon {id} has {size} points"
        )));
    }

    let mut points = Vec::with_capacity(size);
    for _ in 0..size {
        let x = reader.read_f32::<LittleEndian>()?;
        let y = reader.read_f32::<LittleEndian>()?;
        let z = reader.read_f32::<LittleEndian>()?;
        points.push(Vec3::new(x, y, z));
    }

    let mut links = Vec::with_capacity(size);
    for _ in 0..size {
        let target = reader.read_u32::<LittleEndian>()?;
        let edge = reader.read_u16::<LittleEndian>()? as usize;
        if target == NULL_LINK {
            links.push(None);
        } else if (target as usize) < poly_count {
            links.push(Some((target as usize, edge)));
        } else {
            return Err(Error::DataCorrupted(format!(
                "polygon {id} links to missing record {target}"
            )));
        }
    }

    Ok(PolyRecord {
        id,
        type_index,
        tag,
        points,
        links,
    })
}

fn validate_records(records: &[PolyRecord], next_id: u32) -> Result<()> {
    let mut last_id = None;
    for (i, record) in records.iter().enumerate() {
        if record.id >= next_id || last_id.is_some_and(|last| record.id <= last) {
            return Err(Error::DataCorrupted(format!(
                "polygon id {} is out of order or not below {}",
                record.id, next_id
            )));
        }
        last_id = Some(record.id);

        if record.points.iter().any(|p| !p.is_finite()) || polygon_area_2d(&record.points) <= 0.0 {
            return Err(Error::DataCorrupted(format!(
                "polygon {} has invalid geometry",
                record.id
            )));
        }

        for (edge, link) in record.links.iter().enumerate() {
            let Some((j, other_edge)) = *link else { continue };
            let back = records[j].links.get(other_edge).copied().flatten();
            if j == i || back != Some((i, edge)) {
                return Err(Error::DataCorrupted(format!(
                    "link from polygon {} edge {} is not symmetric",
                    record.id, edge
                )));
            }
        }
    }
    Ok(())
}
