use crate::compiler::CompiledMap;

/// Renders the Lua `MAPDATA` table consumed by the runtime.
pub fn render_lua_document(source_name: &str, map: &CompiledMap) -> String {
    let mut lines = vec![
        format!("-- Map data for {source_name}"),
        "MAPDATA = {".to_string(),
        format!("  widthAreas = {},", map.dimensions.width_areas),
        format!("  heightAreas = {},", map.dimensions.height_areas),
        "  areas = {".to_string(),
    ];
    for (area, encoded) in &map.areas {
        lines.push(format!("    [\"{}\"] = \"{}\",", area.key(), encoded));
    }
    lines.push("  },".to_string());
    lines.push("}".to_string());
    lines.join("\n")
}
