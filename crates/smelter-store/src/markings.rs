//! The four TLP marking definitions every fresh database is seeded with.
//!
//! STIX 2.1 fixes their ids; records elsewhere reference them by
//! `object_marking_refs` without ever carrying their bodies.

pub const INITIAL_MARKINGS: [&str; 4] = [
    "insert $mark isa tlp-white, has stix-type \"marking-definition\", \
     has stix-id \"marking-definition--613f2e26-407d-48c7-9eca-b8e91df99dc9\", \
     has spec-version \"2.1\", has created 2017-01-20T00:00:00.000;",
    "insert $mark isa tlp-green, has stix-type \"marking-definition\", \
     has stix-id \"marking-definition--34098fce-860f-48ae-8e50-ebd3cc5e41da\", \
     has spec-version \"2.1\", has created 2017-01-20T00:00:00.000;",
    "insert $mark isa tlp-amber, has stix-type \"marking-definition\", \
     has stix-id \"marking-definition--f88d31f6-486f-44da-b317-01333bde0b82\", \
     has spec-version \"2.1\", has created 2017-01-20T00:00:00.000;",
    "insert $mark isa tlp-red, has stix-type \"marking-definition\", \
     has stix-id \"marking-definition--5e57c739-391a-4eb3-b6be-7d15ca92d5ed\", \
     has spec-version \"2.1\", has created 2017-01-20T00:00:00.000;",
];
